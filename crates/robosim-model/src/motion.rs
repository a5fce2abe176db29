//! A requested displacement and the arbitration verdict it receives.

use robosim_types::Position;

/// A move request from one position to another.
///
/// Carries both endpoints so the arbiter can validate the destination
/// against the mover's footprint without consulting the mover again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    /// Where the mover currently stands.
    pub from: Position,
    /// Where the mover wants to stand.
    pub to: Position,
}

impl Motion {
    /// Create a motion between two positions.
    pub const fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }

    /// Euclidean length of the motion.
    pub fn displacement(self) -> f64 {
        let dx = f64::from(self.to.x.saturating_sub(self.from.x));
        let dy = f64::from(self.to.y.saturating_sub(self.from.y));
        dx.hypot(dy)
    }
}

/// Verdict of the factory arbiter on a [`Motion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// The move was applied. Carries the distance actually covered.
    Committed {
        /// Euclidean length of the committed motion.
        displacement: f64,
    },
    /// The destination was occupied by another mobile component.
    Rejected,
}

impl MoveOutcome {
    /// Whether the move was applied.
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}
