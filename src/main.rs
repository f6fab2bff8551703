use anyhow::Result;
use pharmadash::api;
use pharmadash::config::{Config, DatabaseBackend};
use pharmadash::storage::{PostgresStorage, SqliteStorage, Storage};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "pharmadash=info,tower_http=info,sqlx=warn".into()),
        ))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    info!(
        language = %config.display.language,
        currency = %config.display.currency,
        usd_rate = config.display.usd_rate,
        "Default display settings"
    );

    let mut app = api::create_api_router(
        Arc::clone(&storage),
        config.display.clone(),
        config.inventory.clone(),
    );

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("Serving frontend from directory: {}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    } else {
        info!("No frontend directory configured; serving the API only");
    }

    let app = app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
