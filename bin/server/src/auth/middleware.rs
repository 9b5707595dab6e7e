//! Guard middleware for the protected area.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use gatekeeper_identity::TokenSet;
use std::sync::Arc;

use super::{
    AppState, AuthSession, LOGIN_PATH,
    routes::{REFRESH_TOKEN_COOKIE, found, refresh_token_cookie},
};

/// Lets logged-in sessions through and sends everyone else to login.
///
/// The guard never changes session state, except when silent refresh is
/// enabled and a refresh token cookie logs the session back in.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    match session.state().await {
        Ok(current) if current.is_authenticated() => return next.run(request).await,
        Ok(_) => {}
        Err(e) => return e.into_response(),
    }

    if state.session_config.silent_refresh {
        if let Some(jar) = silent_refresh(&state, &session, jar).await {
            let response = next.run(request).await;
            return (jar, response).into_response();
        }
    }

    tracing::debug!(path = %request.uri().path(), "Not logged in, redirecting to login");
    found(LOGIN_PATH)
}

/// Trades the refresh token cookie for a new authentication context.
///
/// Returns the jar carrying the rotated cookie on success.
async fn silent_refresh(
    state: &AppState,
    session: &AuthSession,
    jar: CookieJar,
) -> Option<CookieJar> {
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE)?.value().to_string();

    let context = match state
        .broker
        .refresh(&refresh_token)
        .await
        .and_then(TokenSet::into_auth_context)
    {
        Ok(context) => context,
        Err(e) => {
            tracing::info!(error = %e, "Silent refresh failed");
            return None;
        }
    };

    let rotated = context.refresh_token().map(str::to_string);
    if let Err(e) = session.establish(context).await {
        tracing::error!(error = %e, "Failed to store refreshed authentication context");
        return None;
    }

    tracing::debug!("Session restored from refresh token");

    Some(match rotated {
        Some(token) => jar.add(refresh_token_cookie(
            token,
            state.session_config.secure_cookies,
        )),
        None => jar,
    })
}
