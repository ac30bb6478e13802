use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use content_studio::gemini_client::{ContentGenerator, GeminiClient};
use content_studio::handlers;
use content_studio::store::{LocalStore, ProjectStore};
use content_studio::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Storage backend is chosen once here and injected everywhere else.
    let data_dir = std::env::var("STUDIO_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let store: Arc<dyn ProjectStore> = Arc::new(LocalStore::new(&data_dir));
    tracing::info!("Using local flat-file store at '{}'", data_dir);

    // Initialize the Gemini client if an API key is provided. A missing
    // key is a visible warning, not a crash; generation endpoints answer
    // with a validation error until one is configured.
    let generator: Option<Arc<dyn ContentGenerator>> = match std::env::var("GEMINI_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing Gemini content generation client...");
            Some(Arc::new(GeminiClient::new(api_key, store.clone())))
        }
        _ => {
            tracing::warn!("GEMINI_API_KEY not found. Content generation will be disabled.");
            tracing::info!("To enable generation, set: GEMINI_API_KEY");
            None
        }
    };

    let shared_state = Arc::new(AppState::new(store, generator));

    // Build our application with all routes and shared state
    let app = Router::new()
        .merge(handlers::generator::generator_routes())
        .merge(handlers::projects::project_routes())
        .merge(handlers::channels::channel_routes())
        .merge(handlers::settings::settings_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,content_studio=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,content_studio=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logging for production log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
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

    tracing::info!("🎬 Content Studio starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );

    let gemini_configured = std::env::var("GEMINI_API_KEY").is_ok();
    tracing::info!(
        "Configuration - Gemini AI: {}",
        if gemini_configured { "✅" } else { "❌" }
    );

    Ok(())
}

// Health / configuration endpoint
async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    axum::response::Json(serde_json::json!({
        "service": "content-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "generation_enabled": state.generator.is_some(),
        "preferred_model": state.store.preferred_model().await,
    }))
}
