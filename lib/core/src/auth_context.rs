//! The authentication record stored in a browser session.
//!
//! A session is "logged in" exactly when it carries an [`AuthContext`].
//! The identity payload inside it is whatever the identity provider put in
//! the identity token; gatekeeper stores it and hands it back but never
//! interprets or validates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded payload of an identity token.
///
/// Kept as raw JSON so that provider-specific claims survive untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityPayload(Value);

impl IdentityPayload {
    /// Wraps a decoded identity token payload.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns a single claim, if present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the `sub` claim, if present and a string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claim("sub").and_then(Value::as_str)
    }
}

/// Result of a successful authentication, stored per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    identity_payload: IdentityPayload,
    access_token: String,
    refresh_token: Option<String>,
    authenticated_at: DateTime<Utc>,
}

impl AuthContext {
    /// Creates a context for a login that just completed.
    #[must_use]
    pub fn new(
        identity_payload: IdentityPayload,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            identity_payload,
            access_token,
            refresh_token,
            authenticated_at: Utc::now(),
        }
    }

    /// Returns the identity token payload.
    #[must_use]
    pub fn identity_payload(&self) -> &IdentityPayload {
        &self.identity_payload
    }

    /// Returns the refresh token, if the provider issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns when the login completed.
    #[must_use]
    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

/// Authentication state of a session as seen by the guard.
///
/// The in-flight callback is not represented: it lives only for the
/// duration of the request that carries it and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No authentication context on the session.
    Anonymous,
    /// The session carries an authentication context.
    Authenticated,
}

impl SessionState {
    /// Derives the state from an optional authentication context.
    #[must_use]
    pub fn of(context: Option<&AuthContext>) -> Self {
        match context {
            Some(_) => Self::Authenticated,
            None => Self::Anonymous,
        }
    }

    /// Returns true if the session may pass the guard.
    #[must_use]
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}
