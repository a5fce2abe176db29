//! Factory snapshot persistence for the Robosim simulation.
//!
//! A factory is stored as the same JSON document that replication publishes
//! ([`robosim_types::FactorySnapshot`]), so the store is a keyed snapshot
//! archive rather than a relational history. Two backends implement the
//! same contract:
//!
//! # Modules
//!
//! - [`store`] -- the [`FactoryStore`] contract (read, persist, list)
//! - [`file`] -- one `<id>.factory` JSON file per factory under a data
//!   directory, the production default
//! - [`memory`] -- a process-local map for tests and ephemeral runs
//! - [`error`] -- shared error types

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file::FileFactoryStore;
pub use memory::InMemoryFactoryStore;
pub use store::FactoryStore;
