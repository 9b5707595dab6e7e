//! The identity broker boundary.
//!
//! Everything that talks to the identity provider goes through
//! [`IdentityBroker`]. The web layer only ever sees login URLs, token sets
//! and authentication errors.

use async_trait::async_trait;
use gatekeeper_core::{AuthContext, Result};
use serde::{Deserialize, Serialize};

use crate::error::AuthenticationError;
use crate::token::decode_identity_payload;

/// Data needed to complete a browser login on callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginState {
    pub csrf_token: String,
    pub pkce_verifier: String,
}

/// Tokens returned by a successful grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub identity_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenSet {
    /// Builds the session authentication context from these tokens.
    ///
    /// # Errors
    ///
    /// Fails if there is no identity token or it cannot be decoded.
    pub fn into_auth_context(self) -> Result<AuthContext, AuthenticationError> {
        let identity_token = self
            .identity_token
            .ok_or(AuthenticationError::MissingIdentityToken)?;
        let payload = decode_identity_payload(&identity_token)?;

        Ok(AuthContext::new(
            payload,
            self.access_token,
            self.refresh_token,
        ))
    }
}

/// Client of the hosted identity provider.
///
/// One broker is built at start-up and shared read-only by every request.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Returns the provider's login page URL and the state to keep until
    /// the callback arrives.
    fn authorization_url(&self) -> (String, LoginState);

    /// Exchanges an authorization code received on the callback.
    async fn exchange_code(
        &self,
        code: &str,
        login_state: &LoginState,
    ) -> Result<TokenSet, AuthenticationError>;

    /// Runs the resource-owner-password grant.
    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, AuthenticationError>;

    /// Exchanges a refresh token for a fresh token set.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthenticationError>;

    /// Tears down any provider-side session for this context.
    ///
    /// Providers without server-side sessions have nothing to do here.
    async fn end_session(&self, _context: &AuthContext) -> Result<(), AuthenticationError> {
        Ok(())
    }
}
