use std::sync::Arc;

use paydash::config::AppConfig;
use paydash::server::{AppState, app};
use paydash::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("💸 paydash v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://{}", config.bind);
    eprintln!("   Session cookie: {}", config.session.cookie_name);
    eprintln!(
        "   Protected: {}",
        config.protected_prefixes.join(", ")
    );

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = match config.db_path {
        Some(ref path) => {
            eprintln!("   Database: {}", path.display());
            Arc::new(LibSqlBackend::new_local(path).await?)
        }
        None => {
            eprintln!("   Database: in-memory");
            Arc::new(LibSqlBackend::new_memory().await?)
        }
    };

    // Drop sessions that expired while the server was down.
    if let Err(e) = db.prune_sessions().await {
        tracing::warn!(error = %e, "Failed to prune expired sessions");
    }

    // ── HTTP ─────────────────────────────────────────────────────────────
    let state = AppState::new(Arc::clone(&db), &config);
    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, "HTTP server started");
    axum::serve(listener, router).await?;

    Ok(())
}
