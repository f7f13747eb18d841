use planes_catalog::{
    AppState, FileRepository, LocalDiskStorage,
    config::{AppConfig, Env, StoreConfig},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{StorageService, StorageState},
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, opens the configured store and the upload
/// directory, then serves HTTP until SIGINT/SIGTERM.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "planes_catalog=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.admin_pass.is_none() {
        tracing::warn!("ADMIN_PASS is not set, admin login will answer 500");
    }
    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set, admin routes will answer 500");
    }

    // 3. Persistence
    let repo: RepositoryState = match &config.store {
        StoreConfig::Postgres { url } => {
            let ssl_mode = match config.env {
                Env::Production => PgSslMode::Require,
                Env::Local => PgSslMode::Disable,
            };
            let options = PgConnectOptions::from_str(url)
                .expect("FATAL: DATABASE_URL is not a valid Postgres connection string")
                .ssl_mode(ssl_mode);

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let repo = PostgresRepository::new(pool);
            repo.migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");

            tracing::info!("Using Postgres store");
            Arc::new(repo) as RepositoryState
        }
        StoreConfig::File { path } => {
            tracing::info!(path = %path.display(), "Using flat-file store");
            Arc::new(FileRepository::new(path.clone())) as RepositoryState
        }
    };

    // 4. Upload storage
    let disk = LocalDiskStorage::new(config.uploads_dir.clone());
    disk.ensure_ready()
        .await
        .expect("FATAL: Failed to create the uploads directory. Check UPLOADS_DIR.");
    let storage = Arc::new(disk) as StorageState;

    // 5. Unified State Assembly
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app_state = AppState {
        repo: repo.clone(),
        storage,
        config,
    };

    // 6. Router and Server Startup
    let app = create_router(app_state);
    let listener = TcpListener::bind(addr)
        .await
        .expect("FATAL: Failed to bind the listen address. Check PORT.");

    tracing::info!("Listening on {}", addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", addr.port());

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = ?e, "HTTP server terminated with an error");
    }

    // 7. Shutdown: drain the store once no request can reach it anymore.
    repo.close().await;
    tracing::info!("Shutdown complete");
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
