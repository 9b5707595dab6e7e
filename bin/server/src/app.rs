//! HTTP router assembly.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use gatekeeper_identity::CALLBACK_PATH;
use std::{path::Path, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::auth::{
    self, AppState, ERROR_PATH, LOGIN_PATH, LOGOUT_PATH, PASSWORD_LOGIN_PATH, PROTECTED_PREFIX,
};

/// Session ID cookie name.
pub const SESSION_COOKIE: &str = "gatekeeper.sid";

/// Directories served as static content.
#[derive(Debug, Clone, Copy)]
pub struct StaticDirs<'a> {
    /// Served to everyone.
    pub public: &'a Path,
    /// Served under `/protected` behind the guard.
    pub protected: &'a Path,
}

/// Builds the application router.
///
/// Sessions live in process memory; running more than one instance needs
/// a shared session store instead.
pub fn router(state: Arc<AppState>, dirs: StaticDirs<'_>) -> Router {
    let session_config = &state.session_config;
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(session_config.secure_cookies)
        .with_expiry(Expiry::OnInactivity(
            time::Duration::minutes(session_config.inactivity_minutes),
        ));

    let protected = Router::new()
        .route("/api/idPayload", get(auth::routes::identity_payload))
        .fallback_service(ServeDir::new(dirs.protected))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route(LOGIN_PATH, get(auth::login))
        .route(CALLBACK_PATH, get(auth::callback))
        .route(PASSWORD_LOGIN_PATH, post(auth::submit_password_login))
        .route(LOGOUT_PATH, get(auth::logout))
        .route(ERROR_PATH, get(auth::error_page))
        .nest(PROTECTED_PREFIX, protected)
        .fallback_service(ServeDir::new(dirs.public))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
