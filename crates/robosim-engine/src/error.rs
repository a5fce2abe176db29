//! Error types for the simulation service binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during service startup.

/// Top-level error for the simulation service binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: robosim_core::config::ConfigError,
    },

    /// Factory store access failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: robosim_store::StoreError,
    },

    /// Demo factory construction failed.
    #[error("model error: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: robosim_model::ModelError,
    },

    /// NATS connection or messaging failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// Observer API server failed.
    #[error("server error: {message}")]
    Server {
        /// Description of the server failure.
        message: String,
    },
}
