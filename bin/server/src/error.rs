//! Error types for gateway request handling.
//!
//! Authentication failures never reach the browser as error payloads: the
//! handlers turn them into redirects. What is left here are the failures
//! that cannot be expressed as a redirect.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// Errors surfaced by gateway handlers.
#[derive(Debug)]
pub enum GatewayError {
    /// The session store failed to load or save the session.
    Session { details: String },
    /// A handler behind the guard found no authentication context.
    MissingAuthContext,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session { details } => write!(f, "session store error: {details}"),
            Self::MissingAuthContext => write!(f, "no authentication context on session"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<tower_sessions::session::Error> for GatewayError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session {
            details: err.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            Self::Session { details } => {
                tracing::error!(%details, "Session store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            Self::MissingAuthContext => {
                tracing::warn!("Guarded handler reached without authentication context");
                (StatusCode::UNAUTHORIZED, "Not authenticated").into_response()
            }
        }
    }
}
