//! Handler outcomes and their HTTP rendering.
//!
//! A handler reports what happened as a value. The transactional wrapper
//! reads it to decide between commit and rollback, and the routing layer
//! renders it. Exactly one response leaves per request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body of the wrapper-level fallback response.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred!";

/// Body of the routing-level last-resort response.
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "An unexpected error occurred while executing the request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler completed; its transaction may be committed.
    Success { status: StatusCode, message: &'static str },
    /// The handler rejected the request and chose the response itself.
    BusinessError { status: StatusCode, message: &'static str },
    /// The handler failed on the storage layer. Rendered as the generic
    /// failure response.
    InfrastructureError,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success { status, .. } | Outcome::BusinessError { status, .. } => *status,
            Outcome::InfrastructureError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Success { message, .. } | Outcome::BusinessError { message, .. } => *message,
            Outcome::InfrastructureError => GENERIC_FAILURE_MESSAGE,
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}
