use axum::{Extension, Router};
use context_engine::cache::TtlCache;
use context_engine::channel_resolver::ChannelResolver;
use context_engine::claude_client::ClaudeClient;
use context_engine::config::Settings;
use context_engine::display::GridSession;
use context_engine::gemini_client::GeminiClient;
use context_engine::models::ai::Angle;
use context_engine::youtube_client::YouTubeClient;
use context_engine::{db, handlers, middleware, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let settings = Settings::from_env();

    let database_url = settings
        .database_url
        .clone()
        .expect("DATABASE_URL must be set");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool.");

    let youtube_client = match settings.youtube_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing YouTube Data API client...");
            Some(YouTubeClient::new(api_key, settings.request_timeout))
        }
        None => {
            tracing::warn!("GOOGLE_API_KEY not found. Thumbnail tests and channel scraping will be disabled.");
            None
        }
    };

    let gemini_client = match settings.gemini_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing Gemini client ({})...", settings.gemini_model);
            Some(GeminiClient::new(api_key, settings.gemini_model.clone()))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not found. Gemini generation disabled.");
            None
        }
    };

    let claude_client = match settings.anthropic_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing Claude client ({})...", settings.claude_model);
            Some(ClaudeClient::new(api_key, settings.claude_model.clone()))
        }
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not found. Claude generation disabled.");
            None
        }
    };

    if gemini_client.is_none() && claude_client.is_none() {
        tracing::warn!("No AI provider configured, built-in fallback content will be used");
    }
    if settings.jwt_secret.is_none() {
        tracing::warn!("SUPABASE_JWT_SECRET not found. Authenticated routes will reject every request.");
    }

    let sessions: TtlCache<Uuid, GridSession> = TtlCache::new(settings.session_ttl);
    let angle_cache: TtlCache<String, Vec<Angle>> = TtlCache::new(settings.session_ttl);
    sessions.spawn_purger("session", CACHE_PURGE_INTERVAL);
    angle_cache.spawn_purger("angle", CACHE_PURGE_INTERVAL);
    tracing::info!("🗂️ Session cache ready (ttl {:?})", settings.session_ttl);

    let bind_address = settings.bind_address();

    let shared_state = Arc::new(AppState {
        db_pool,
        resolver: ChannelResolver::new(settings.request_timeout),
        settings,
        youtube_client,
        gemini_client,
        claude_client,
        sessions,
        angle_cache,
    });

    let app = Router::new()
        .merge(handlers::thumbnail::thumbnail_routes())
        .merge(handlers::viral::viral_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .expect("Failed to bind listener");
    tracing::info!("🚀 Listening on {}", bind_address);
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .expect("Server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,context_engine=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,context_engine=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
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

    tracing::info!("🎬 Context engine starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

// API Status endpoint
async fn api_status(Extension(state): Extension<Arc<AppState>>) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let configured = |present: bool| if present { "configured" } else { "not_configured" };
    let cached_sessions = state.sessions.len().await;
    let cached_angles = state.angle_cache.len().await;

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "youtube_api": configured(state.youtube_client.is_some()),
            "gemini_ai": configured(state.gemini_client.is_some()),
            "claude_ai": configured(state.claude_client.is_some()),
            "auth": configured(state.settings.jwt_secret.is_some())
        },
        "cache": {
            "sessions": cached_sessions,
            "angles": cached_angles
        }
    }))
}
