//! Authentication routes for login, callback, password login and logout.

use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatekeeper_core::{AuthContext, IdentityPayload};
use gatekeeper_identity::{AuthenticationError, LoginState, TokenSet};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use time::Duration as TimeDuration;

use super::{AppState, AuthSession, ERROR_PATH, LOGIN_PATH};
use crate::error::GatewayError;

/// Login state cookie name (CSRF and PKCE data for the callback).
const AUTH_STATE_COOKIE: &str = "gatekeeper.auth_state";

/// Refresh token cookie name.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Lifetime of the refresh token cookie.
const REFRESH_TOKEN_DAYS: i64 = 30;

/// Query parameters the identity provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Resource-owner-password login form.
#[derive(Deserialize)]
pub struct PasswordLoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Sends the browser to the identity provider's login page.
///
/// Always redirects, even for a session that is already logged in.
pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (auth_url, login_state) = state.broker.authorization_url();

    let login_state_json = match serde_json::to_string(&login_state) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize login state");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    let cookie = Cookie::build((AUTH_STATE_COOKIE, login_state_json))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10));

    (jar.add(cookie), found(&auth_url)).into_response()
}

/// Completes the browser login after the identity provider redirects back.
///
/// Any failure ends on the error page with the session untouched.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let outcome = match query {
        Ok(Query(query)) => complete_callback(&state, &query, &jar).await,
        Err(rejection) => Err(CallbackFailure::InvalidQuery(rejection.body_text())),
    };
    let jar = jar.add(expired(AUTH_STATE_COOKIE));

    match outcome {
        Ok(context) => establish(&state, &session, jar, context, ERROR_PATH).await,
        Err(failure) => {
            tracing::warn!(%failure, "Login callback failed");
            (jar, found(ERROR_PATH)).into_response()
        }
    }
}

/// Logs in with a username and password through the identity provider.
pub async fn submit_password_login(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    jar: CookieJar,
    form: Result<Form<PasswordLoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Unreadable password login form");
            return (jar, found(LOGIN_PATH)).into_response();
        }
    };

    if form.username.is_empty() || form.password.is_empty() {
        tracing::debug!("Password login submitted without credentials");
        return (jar, found(LOGIN_PATH)).into_response();
    }

    let outcome = state
        .broker
        .exchange_password(&form.username, &form.password)
        .await
        .and_then(TokenSet::into_auth_context);

    match outcome {
        Ok(context) => establish(&state, &session, jar, context, LOGIN_PATH).await,
        Err(e) => {
            tracing::warn!(error = %e, "Password login failed");
            (jar, found(LOGIN_PATH)).into_response()
        }
    }
}

/// Logs the session out and drops the refresh token cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    jar: CookieJar,
) -> Result<Response, GatewayError> {
    if let Some(context) = session.auth_context().await? {
        if let Err(e) = state.broker.end_session(&context).await {
            tracing::warn!(error = %e, "Identity provider session teardown failed");
        }
        session.clear().await?;
        tracing::info!(
            subject = subject_of(&context),
            authenticated_at = %context.authenticated_at(),
            "Logged out"
        );
    }

    Ok((jar.add(expired(REFRESH_TOKEN_COOKIE)), found(LOGIN_PATH)).into_response())
}

/// Returns the identity token payload of the logged-in session.
pub async fn identity_payload(session: AuthSession) -> Result<Json<IdentityPayload>, GatewayError> {
    let context = session
        .auth_context()
        .await?
        .ok_or(GatewayError::MissingAuthContext)?;

    Ok(Json(context.identity_payload().clone()))
}

/// Plain-text failure page for the browser login flow.
pub async fn error_page() -> &'static str {
    "Authentication Error"
}

/// Stores the context on the session and sends the browser to the landing
/// page, or to `failure_path` if the session cannot be written.
async fn establish(
    state: &AppState,
    session: &AuthSession,
    jar: CookieJar,
    context: AuthContext,
    failure_path: &str,
) -> Response {
    let subject = subject_of(&context).to_string();
    let refresh_token = context.refresh_token().map(str::to_string);

    if let Err(e) = session.establish(context).await {
        tracing::error!(error = %e, "Failed to store authentication context");
        return (jar, found(failure_path)).into_response();
    }

    let jar = match refresh_token {
        Some(token) => jar.add(refresh_token_cookie(
            token,
            state.session_config.secure_cookies,
        )),
        None => jar,
    };

    tracing::info!(%subject, "Login successful");

    (jar, found(&state.landing_page)).into_response()
}

async fn complete_callback(
    state: &AppState,
    query: &CallbackQuery,
    jar: &CookieJar,
) -> Result<AuthContext, CallbackFailure> {
    if let Some(error) = &query.error {
        return Err(CallbackFailure::Provider {
            error: error.clone(),
            description: query.error_description.clone(),
        });
    }

    let code = query.code.as_deref().ok_or(CallbackFailure::MissingCode)?;

    let login_state_cookie = jar
        .get(AUTH_STATE_COOKIE)
        .ok_or(CallbackFailure::MissingLoginState)?;
    let login_state: LoginState = serde_json::from_str(login_state_cookie.value())
        .map_err(|_| CallbackFailure::InvalidLoginState)?;

    // Validate CSRF token
    if query.state.as_deref() != Some(login_state.csrf_token.as_str()) {
        return Err(CallbackFailure::StateMismatch);
    }

    state
        .broker
        .exchange_code(code, &login_state)
        .await
        .and_then(TokenSet::into_auth_context)
        .map_err(CallbackFailure::Exchange)
}

/// Plain 302 redirect.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub(crate) fn refresh_token_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::days(REFRESH_TOKEN_DAYS))
        .build()
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

fn subject_of(context: &AuthContext) -> &str {
    context.identity_payload().subject().unwrap_or("unknown")
}

/// Why a callback did not produce a logged-in session.
#[derive(Debug)]
enum CallbackFailure {
    Provider {
        error: String,
        description: Option<String>,
    },
    InvalidQuery(String),
    MissingCode,
    MissingLoginState,
    InvalidLoginState,
    StateMismatch,
    Exchange(Report<AuthenticationError>),
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { error, description } => match description {
                Some(description) => write!(f, "provider returned {error}: {description}"),
                None => write!(f, "provider returned {error}"),
            },
            Self::InvalidQuery(reason) => write!(f, "unreadable callback query: {reason}"),
            Self::MissingCode => write!(f, "callback has no authorization code"),
            Self::MissingLoginState => write!(f, "login state cookie is missing"),
            Self::InvalidLoginState => write!(f, "login state cookie is unreadable"),
            Self::StateMismatch => write!(f, "CSRF state mismatch"),
            Self::Exchange(report) => write!(f, "{report}"),
        }
    }
}
