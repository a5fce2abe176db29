//! Error types for the observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use robosim_store::StoreError;
use robosim_types::FactoryId;

/// Errors that can occur in the observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persistence layer reported an error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ObserverError {
    /// Not-found error for a factory id with no prepared simulation.
    pub fn not_prepared(id: &FactoryId) -> Self {
        Self::NotFound(format!("no prepared simulation: {id}"))
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Store(error @ StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, error.to_string())
            }
            Self::Store(error @ (StoreError::MissingId | StoreError::InvalidId(_))) => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Store(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
