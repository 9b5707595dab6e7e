//! Authentication gateway for the gatekeeper server.
//!
//! This module provides:
//! - Login, callback, password-login and logout handlers
//! - The guard middleware protecting everything under `/protected`
//! - A typed view of the browser session (`AuthSession`)
//!
//! # Session Model
//!
//! A session is logged in exactly when it carries an
//! [`AuthContext`](gatekeeper_core::AuthContext). Only the callback, the
//! password login and logout change that; the guard only reads it.
//!
//! Login is always forced: visiting the login entry point sends the browser
//! to the identity provider even when the session is already logged in.

pub mod middleware;
pub mod routes;
pub mod session;

use crate::config::SessionConfig;
use gatekeeper_identity::IdentityBroker;
use std::sync::Arc;

pub use middleware::require_session;
pub use routes::{callback, error_page, login, logout, submit_password_login};
pub use session::AuthSession;

/// Login entry point.
pub const LOGIN_PATH: &str = "/";

/// Failure page for the browser login flow.
pub const ERROR_PATH: &str = "/error";

/// Resource-owner-password form target.
pub const PASSWORD_LOGIN_PATH: &str = "/rop/login/submit";

/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/logout";

/// Prefix of everything the guard protects.
pub const PROTECTED_PREFIX: &str = "/protected";

/// Shared application state.
pub struct AppState {
    /// Client of the identity provider, built once at start-up.
    pub broker: Arc<dyn IdentityBroker>,
    /// Session configuration.
    pub session_config: SessionConfig,
    /// Where successful logins land.
    pub landing_page: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        broker: Arc<dyn IdentityBroker>,
        session_config: SessionConfig,
        landing_page: String,
    ) -> Self {
        Self {
            broker,
            session_config,
            landing_page,
        }
    }
}
