use std::sync::Arc;

use video_studio::config::AppConfig;
use video_studio::fal_client::FalClient;
use video_studio::services::PgVideoStore;
use video_studio::{db, handlers, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env()?;
    let database_url = config.require_database_url()?;

    let db_pool = db::create_pool(database_url, config.db_max_connections).await?;
    tracing::info!("✅ Database pool ready ({} connections max)", config.db_max_connections);

    tracing::info!("🔌 fal.ai queue at {}", config.fal_queue_url);
    let provider = Arc::new(FalClient::with_base_url(
        config.fal_key.clone(),
        config.fal_queue_url.clone(),
    ));
    let store = Arc::new(PgVideoStore::new(db_pool));
    let shared_state = Arc::new(AppState::new(provider, store));

    let app = handlers::app(shared_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    Ok(())
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,video_studio=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,video_studio=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎬 Video studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!(
        "Configuration - Database: {}, fal.ai key: {}",
        if std::env::var("DATABASE_URL").is_ok() { "✅" } else { "❌" },
        if std::env::var("FAL_KEY").is_ok() { "✅" } else { "❌" }
    );

    Ok(())
}
