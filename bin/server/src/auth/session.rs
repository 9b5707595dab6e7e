//! Typed access to the authentication context in the browser session.

use axum::{extract::FromRequestParts, http::request::Parts};
use gatekeeper_core::{AuthContext, SessionState};
use tower_sessions::Session;

use crate::error::GatewayError;

/// Session key holding the [`AuthContext`].
const AUTH_CONTEXT_KEY: &str = "auth_context";

/// The browser session, seen only through its authentication context.
#[derive(Clone)]
pub struct AuthSession(Session);

impl AuthSession {
    /// Wraps a raw session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Returns the authentication context, if the session is logged in.
    pub async fn auth_context(&self) -> Result<Option<AuthContext>, GatewayError> {
        Ok(self.0.get::<AuthContext>(AUTH_CONTEXT_KEY).await?)
    }

    /// Returns whether the session is logged in.
    pub async fn state(&self) -> Result<SessionState, GatewayError> {
        Ok(SessionState::of(self.auth_context().await?.as_ref()))
    }

    /// Logs the session in.
    ///
    /// The session ID is rotated before the context is written, so a
    /// failure leaves the stored data untouched.
    pub async fn establish(&self, context: AuthContext) -> Result<(), GatewayError> {
        self.0.cycle_id().await?;
        self.0.insert(AUTH_CONTEXT_KEY, context).await?;
        Ok(())
    }

    /// Logs the session out, returning the context that was removed.
    pub async fn clear(&self) -> Result<Option<AuthContext>, GatewayError> {
        Ok(self.0.remove::<AuthContext>(AUTH_CONTEXT_KEY).await?)
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| GatewayError::Session {
                details: message.to_string(),
            })?;
        Ok(Self(session))
    }
}
