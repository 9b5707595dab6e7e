//! OAuth2 broker implementation using the oauth2 crate.

use async_trait::async_trait;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    RefreshToken, RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
};
use gatekeeper_core::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::broker::{IdentityBroker, LoginState, TokenSet};
use crate::config::IdentityConfig;
use crate::error::AuthenticationError;

/// Scope requested on every grant.
const OPENID_SCOPE: &str = "openid";

/// Token response fields beyond the OAuth2 core set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
}

impl ExtraTokenFields for IdentityTokenFields {}

type BrokerTokenResponse = StandardTokenResponse<IdentityTokenFields, BasicTokenType>;

/// Client with authorization and token endpoints configured.
type BrokerClient = Client<
    BasicErrorResponse,
    BrokerTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Identity broker backed by a hosted OAuth2 authorization server.
pub struct OAuthBroker {
    client: BrokerClient,
    http_client: reqwest::Client,
}

impl OAuthBroker {
    /// Builds the broker from a resolved configuration.
    ///
    /// `timeout` bounds every call to the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if an endpoint URL is invalid or the HTTP
    /// client cannot be created.
    pub fn new(
        config: &IdentityConfig,
        timeout: Duration,
    ) -> Result<Self, AuthenticationError> {
        let auth_url = AuthUrl::new(config.authorization_endpoint())
            .map_err(|e| configuration(format!("invalid authorization URL: {e}")))?;
        let token_url = TokenUrl::new(config.token_endpoint())
            .map_err(|e| configuration(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string())
            .map_err(|e| configuration(format!("invalid redirect URI: {e}")))?;

        let client = Client::new(ClientId::new(config.client_id().to_string()))
            .set_client_secret(ClientSecret::new(config.secret().to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityBroker for OAuthBroker {
    fn authorization_url(&self) -> (String, LoginState) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(OPENID_SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let state = LoginState {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };

        (auth_url.to_string(), state)
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        login_state: &LoginState,
    ) -> Result<TokenSet, AuthenticationError> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(login_state.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        Ok(token_set(&token_response))
    }

    #[tracing::instrument(skip(self, password))]
    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, AuthenticationError> {
        let username = ResourceOwnerUsername::new(username.to_string());
        let password = ResourceOwnerPassword::new(password.to_string());

        let token_response = self
            .client
            .exchange_password(&username, &password)
            .add_scope(Scope::new(OPENID_SCOPE.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        Ok(token_set(&token_response))
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthenticationError> {
        let refresh_token = RefreshToken::new(refresh_token.to_string());

        let token_response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http_client)
            .await
            .map_err(token_error)?;

        let mut tokens = token_set(&token_response);
        // Providers may omit the refresh token when it is not rotated
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.secret().clone());
        }
        Ok(tokens)
    }
}

fn token_set(response: &BrokerTokenResponse) -> TokenSet {
    TokenSet {
        access_token: response.access_token().secret().clone(),
        identity_token: response.extra_fields().id_token.clone(),
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
    }
}

/// Separates provider refusals from transport failures.
fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> AuthenticationError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            let reason = match response.error_description() {
                Some(description) => format!("{}: {description}", response.error()),
                None => response.error().to_string(),
            };
            AuthenticationError::ProviderRejected { reason }
        }
        other => AuthenticationError::ProviderUnavailable {
            reason: other.to_string(),
        },
    }
}

fn configuration(reason: String) -> AuthenticationError {
    AuthenticationError::Configuration { reason }
}
