//! Identity provider configuration.
//!
//! The provider is an OAuth2 authorization server addressed by a single
//! base URL (`oauthServerUrl`); the authorization and token endpoints hang
//! off it. Field names follow the credential JSON issued by the provider so
//! that service-binding blobs deserialize without translation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path the identity provider redirects back to after login.
pub const CALLBACK_PATH: &str = "/index.html";

/// Configuration for the identity provider client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    /// Tenant the client is registered in.
    tenant_id: String,
    /// The OAuth2 client ID.
    client_id: String,
    /// The OAuth2 client secret.
    secret: String,
    /// Base URL of the provider's OAuth2 server.
    oauth_server_url: String,
    /// Where the provider sends the browser after login.
    redirect_uri: String,
}

impl IdentityConfig {
    /// Creates a new identity provider configuration.
    #[must_use]
    pub fn new(
        tenant_id: String,
        client_id: String,
        secret: String,
        oauth_server_url: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            tenant_id,
            client_id,
            secret,
            oauth_server_url,
            redirect_uri,
        }
    }

    /// Returns the tenant ID.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the base URL of the OAuth2 server, without a trailing slash.
    #[must_use]
    pub fn oauth_server_url(&self) -> &str {
        self.oauth_server_url.trim_end_matches('/')
    }

    /// Returns the OAuth2 redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/authorization", self.oauth_server_url())
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.oauth_server_url())
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .field("oauth_server_url", &self.oauth_server_url)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}
