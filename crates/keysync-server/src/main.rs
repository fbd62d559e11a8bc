use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use keysync_core::config::DirectoryConfig;
use keysync_core::SnapshotStore;
use keysync_directory::{Directory, DirectoryClient, OauthClient, ServiceAccountTokenSource};
use keysync_snapshot::{S3Publisher, SnapshotBuilder, Synchronizer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keysync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let bind_address = config.bind_address;
    tracing::info!("starting key synchronization server on {}", bind_address);

    let store = Arc::new(SnapshotStore::new());

    let token_source = Arc::new(ServiceAccountTokenSource::new(&config.service_account)?);
    let directory: Arc<dyn Directory> = Arc::new(DirectoryClient::new(
        DirectoryConfig::new(config.directory_base_url.as_str())?,
        token_source,
    )?);
    let oauth = Arc::new(OauthClient::new(config.oauth.clone())?);

    let publisher = Arc::new(
        S3Publisher::from_env(config.sync.bucket.clone(), config.sync.object_key.clone()).await,
    );
    let synchronizer = Synchronizer::new(
        SnapshotBuilder::new(directory.clone(), config.sync.groups.clone()),
        publisher,
        store.clone(),
        config.sync.refresh_interval(),
    );

    let cancel = CancellationToken::new();
    let sync_task = tokio::spawn(synchronizer.run(cancel.clone()));

    let state = Arc::new(AppState {
        store,
        directory,
        oauth,
    });
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!("server listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    // Let an in-flight rebuild finish or fail naturally.
    sync_task.await?;
    Ok(())
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::oauth::index))
        .route("/callback", get(api::oauth::callback))
        .route("/submit", post(api::submit::submit_key))
        .route("/authmap", get(api::authmap::get_authmap))
        .route("/health", get(api::health::health_check))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
