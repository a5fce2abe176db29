//! Identifier types for factories and factory components.
//!
//! Components are identified by a strongly-typed UUID v7 wrapper so that
//! component references cannot be confused with other identifiers at compile
//! time. Factories are identified by a caller-chosen string key, which doubles
//! as the persistence key and the simulation registry key.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for a component inside a factory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ComponentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ComponentId> for Uuid {
    fn from(id: ComponentId) -> Self {
        id.0
    }
}

/// Identifier of a factory, chosen by the caller.
///
/// The same key addresses the factory in the persistent store, in the
/// simulation registry, and on the replication subject. Stores reject
/// persistence of a factory whose identifier is empty.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct FactoryId(pub String);

impl FactoryId {
    /// Create a factory identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for FactoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FactoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FactoryId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ids_are_unique() {
        let a = ComponentId::new();
        let b = ComponentId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn component_id_roundtrip_serde() {
        let original = ComponentId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<ComponentId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn factory_id_display_matches_inner() {
        let id = FactoryId::new("puck-factory");
        assert_eq!(id.to_string(), "puck-factory");
        assert_eq!(id.as_str(), "puck-factory");
        assert!(!id.is_empty());
    }

    #[test]
    fn empty_factory_id_is_detectable() {
        let id = FactoryId::new("");
        assert!(id.is_empty());
    }
}
