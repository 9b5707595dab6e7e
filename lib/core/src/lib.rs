//! Core session types and error handling for gatekeeper.
//!
//! This crate provides the typed authentication record kept in a browser
//! session and the `Result` alias shared by the other gatekeeper crates.

pub mod auth_context;
pub mod error;

pub use auth_context::{AuthContext, IdentityPayload, SessionState};
pub use error::Result;
