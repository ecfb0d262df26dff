//! # Cafe API server
//!
//! ```text
//! config ──► tracing ──► SQLite (migrations) ──► axum on host:port
//!                                                   │
//!                             Ctrl+C / SIGTERM ─────┘ graceful shutdown
//! ```

use cafe_api::config::LogFormat;
use cafe_api::{build_app, ApiConfig, AppState};
use cafe_db::Database;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ApiConfig::load()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }

    info!("Starting Cafe API server...");
    info!(
        addr = %config.bind_addr(),
        database = %config.database_path,
        environment = ?config.environment,
        "Configuration loaded"
    );

    // Connect to database (migrations run on open)
    let db = Database::new(config.db_config()).await?;
    let (total, applied) = db.migration_status().await?;
    info!(total, applied, "Database ready");

    let addr = config.bind_addr();
    let app = build_app(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
