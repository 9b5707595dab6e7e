use gatekeeper_identity::{OAuthBroker, ResolverChain};
use gatekeeper_server::{
    app::{self, StaticDirs},
    auth::AppState,
    config::ServerConfig,
};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Without identity provider credentials nothing can be served
    let resolved = match ResolverChain::standard(&config.local_config).resolve() {
        Ok(resolved) => resolved,
        Err(report) => {
            tracing::error!("Identity provider configuration unavailable:\n{report}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        source = resolved.source,
        tenant_id = resolved.config.tenant_id(),
        redirect_uri = resolved.config.redirect_uri(),
        "Resolved identity provider configuration"
    );

    let broker = match OAuthBroker::new(
        &resolved.config,
        Duration::from_secs(config.broker_timeout_seconds),
    ) {
        Ok(broker) => broker,
        Err(report) => {
            tracing::error!("Failed to initialize identity broker:\n{report}");
            std::process::exit(1);
        }
    };

    if config.session.silent_refresh {
        tracing::info!("Silent refresh from refresh token cookie is enabled");
    }

    let app_state = Arc::new(AppState::new(
        Arc::new(broker),
        config.session.clone(),
        config.landing_page.clone(),
    ));

    let app = app::router(
        app_state,
        StaticDirs {
            public: &config.public_dir,
            protected: &config.protected_dir,
        },
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
