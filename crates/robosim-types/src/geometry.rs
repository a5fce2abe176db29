//! Planar geometry primitives shared across the workspace.
//!
//! All coordinates are integer factory units with the origin at the top-left
//! corner, x growing rightwards and y growing downwards. Collision tests use
//! strict axis-aligned bounding box intersection: shapes that merely touch
//! along an edge do not overlap.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point on the factory floor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate, growing rightwards.
    pub x: i32,
    /// Vertical coordinate, growing downwards.
    pub y: i32,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Rect {
    /// Horizontal coordinate of the top-left corner.
    pub x: i32,
    /// Vertical coordinate of the top-left corner.
    pub y: i32,
    /// Horizontal extent.
    pub width: i32,
    /// Vertical extent.
    pub height: i32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and extents.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The x coordinate one past the right edge.
    pub const fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// The y coordinate one past the bottom edge.
    pub const fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// The top-left corner as a [`Position`].
    pub const fn position(self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Strict intersection test. Rectangles sharing only an edge or a
    /// corner do not overlap, and zero-extent rectangles overlap nothing.
    pub const fn overlaps(self, other: Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether the point lies inside the rectangle. The right and bottom
    /// edges are exclusive.
    pub const fn contains_point(self, point: Position) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Whether `other` lies entirely within this rectangle.
    pub const fn contains_rect(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// The side of a room wall a door is cut into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum WallSide {
    /// The wall along the room's top edge.
    Top,
    /// The wall along the room's bottom edge.
    Bottom,
    /// The wall along the room's left edge.
    Left,
    /// The wall along the room's right edge.
    Right,
}

/// Outline of a component, positioned by the owning component.
///
/// Collision detection reduces every shape to its axis-aligned bounding
/// rectangle, so the outline only affects rendering and footprint size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Shape {
    /// Axis-aligned rectangle.
    Rectangle {
        /// Horizontal extent.
        width: i32,
        /// Vertical extent.
        height: i32,
    },
    /// Circle, collision-tested via its bounding square.
    Circle {
        /// Circle radius. The bounding square has sides of twice this value.
        radius: i32,
    },
    /// Closed polygon with vertices relative to the component position.
    Polygon {
        /// Outline vertices, offsets from the component's top-left corner.
        vertices: Vec<Position>,
    },
}

impl Shape {
    /// The bounding rectangle of this shape when anchored at `origin`.
    pub fn bounding_rect(&self, origin: Position) -> Rect {
        match self {
            Self::Rectangle { width, height } => Rect::new(origin.x, origin.y, *width, *height),
            Self::Circle { radius } => {
                let side = radius.saturating_mul(2);
                Rect::new(origin.x, origin.y, side, side)
            }
            Self::Polygon { vertices } => {
                let Some(first) = vertices.first() else {
                    return Rect::new(origin.x, origin.y, 0, 0);
                };
                let mut min = *first;
                let mut max = *first;
                for vertex in vertices {
                    min.x = min.x.min(vertex.x);
                    min.y = min.y.min(vertex.y);
                    max.x = max.x.max(vertex.x);
                    max.y = max.y.max(vertex.y);
                }
                Rect::new(
                    origin.x.saturating_add(min.x),
                    origin.y.saturating_add(min.y),
                    max.x.saturating_sub(min.x),
                    max.y.saturating_sub(min.y),
                )
            }
        }
    }
}
