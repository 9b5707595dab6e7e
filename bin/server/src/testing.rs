//! Test doubles for exercising the router end to end.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use gatekeeper_core::AuthContext;
use gatekeeper_identity::{AuthenticationError, IdentityBroker, LoginState, TokenSet};
use http_body_util::BodyExt;
use rootcause::prelude::Report;
use serde_json::json;
use std::{
    collections::HashMap,
    fs,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    app::{self, StaticDirs},
    auth::AppState,
    config::SessionConfig,
};

pub(crate) const PROVIDER_LOGIN_URL: &str = "https://broker.test/authorization?state=csrf-1";
pub(crate) const CSRF_TOKEN: &str = "csrf-1";
pub(crate) const VALID_CODE: &str = "valid-code";
pub(crate) const REFRESH_TOKEN: &str = "refresh-1";
pub(crate) const ROTATED_REFRESH_TOKEN: &str = "refresh-2";
pub(crate) const LANDING_PAGE: &str = "/protected/protected.html";
pub(crate) const SUBJECT: &str = "user-1";

const PKCE_VERIFIER: &str = "verifier-1";
const USERNAME: &str = "alice";
const PASSWORD: &str = "secret";

/// Broker that accepts one known code, one known password and one known
/// refresh token.
#[derive(Default)]
pub(crate) struct ScriptedBroker {
    ended_sessions: AtomicUsize,
}

impl ScriptedBroker {
    pub(crate) fn ended_sessions(&self) -> usize {
        self.ended_sessions.load(Ordering::SeqCst)
    }
}

fn identity_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "sub": SUBJECT, "name": "Alice", "email": "alice@example.com" }).to_string(),
    );
    format!("{header}.{payload}.signature")
}

fn tokens(refresh_token: &str) -> TokenSet {
    TokenSet {
        access_token: "access-token".to_string(),
        identity_token: Some(identity_token()),
        refresh_token: Some(refresh_token.to_string()),
    }
}

fn rejected(reason: &str) -> Report<AuthenticationError> {
    AuthenticationError::ProviderRejected {
        reason: reason.to_string(),
    }
    .into()
}

#[async_trait]
impl IdentityBroker for ScriptedBroker {
    fn authorization_url(&self) -> (String, LoginState) {
        (
            PROVIDER_LOGIN_URL.to_string(),
            LoginState {
                csrf_token: CSRF_TOKEN.to_string(),
                pkce_verifier: PKCE_VERIFIER.to_string(),
            },
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        login_state: &LoginState,
    ) -> Result<TokenSet, Report<AuthenticationError>> {
        if code == VALID_CODE && login_state.pkce_verifier == PKCE_VERIFIER {
            Ok(tokens(REFRESH_TOKEN))
        } else {
            Err(rejected("invalid_grant"))
        }
    }

    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenSet, Report<AuthenticationError>> {
        if username == USERNAME && password == PASSWORD {
            Ok(tokens(REFRESH_TOKEN))
        } else {
            Err(rejected("invalid_grant"))
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Report<AuthenticationError>> {
        if refresh_token == REFRESH_TOKEN {
            Ok(tokens(ROTATED_REFRESH_TOKEN))
        } else {
            Err(rejected("invalid_grant"))
        }
    }

    async fn end_session(&self, _context: &AuthContext) -> Result<(), Report<AuthenticationError>> {
        self.ended_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A router over scratch static directories.
pub(crate) struct Fixture {
    pub(crate) broker: Arc<ScriptedBroker>,
    pub(crate) router: Router,
    _public: TempDir,
    _protected: TempDir,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_session_config(SessionConfig::default())
    }

    pub(crate) fn with_silent_refresh() -> Self {
        Self::with_session_config(SessionConfig {
            silent_refresh: true,
            ..SessionConfig::default()
        })
    }

    fn with_session_config(session_config: SessionConfig) -> Self {
        let public = TempDir::new().expect("public dir");
        let protected = TempDir::new().expect("protected dir");
        fs::write(public.path().join("login.html"), "login form").expect("public file");
        fs::write(protected.path().join("protected.html"), "members only")
            .expect("protected file");

        let broker = Arc::new(ScriptedBroker::default());
        let state = Arc::new(AppState::new(
            broker.clone(),
            session_config,
            LANDING_PAGE.to_string(),
        ));
        let router = app::router(
            state,
            StaticDirs {
                public: public.path(),
                protected: protected.path(),
            },
        );

        Self {
            broker,
            router,
            _public: public,
            _protected: protected,
        }
    }

    pub(crate) fn browser(&self) -> Browser {
        Browser {
            router: self.router.clone(),
            cookies: HashMap::new(),
        }
    }
}

/// Sends requests through the router while keeping cookies between them.
pub(crate) struct Browser {
    router: Router,
    cookies: HashMap<String, String>,
}

impl Browser {
    pub(crate) async fn get(&mut self, uri: &str) -> Response {
        let request = Request::builder().uri(uri);
        self.send(request, Body::empty()).await
    }

    pub(crate) async fn post_form(&mut self, uri: &str, form: &str) -> Response {
        self.post(uri, "application/x-www-form-urlencoded", form).await
    }

    pub(crate) async fn post(&mut self, uri: &str, content_type: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        self.send(request, Body::from(body.to_string())).await
    }

    /// Runs the provider login round trip and returns the callback response.
    pub(crate) async fn log_in(&mut self) -> Response {
        self.get("/").await;
        self.get(&format!("/index.html?code={VALID_CODE}&state={CSRF_TOKEN}"))
            .await
    }

    pub(crate) fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub(crate) fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> Response {
        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(header::COOKIE, cookie_header);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("infallible");

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            self.store(set_cookie.to_str().expect("ascii cookie"));
        }
        response
    }

    fn store(&mut self, set_cookie: &str) {
        let mut parts = set_cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.trim().split_once('=')) else {
            return;
        };
        let expired = parts.any(|attr| attr.trim().eq_ignore_ascii_case("max-age=0"));

        if expired || value.is_empty() {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }
}

pub(crate) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
}

pub(crate) async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
