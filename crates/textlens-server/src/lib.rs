//! TextLens server library logic.

pub mod ai;
pub mod api_ai;
pub mod api_analyze;
pub mod api_auth;
pub mod api_dashboard;
pub mod api_favorites;
pub mod api_history;
pub mod background;
pub mod config;
pub mod middleware;

use ai::AiManager;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use config::Config;
use middleware::RateLimiter;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use textlens_db::DbPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Session lifetime in days.
    pub session_ttl_days: u32,
    /// Per-minute request limit for most endpoints.
    pub default_rate_limit: u32,
    /// Per-minute request limit for login/register.
    pub auth_rate_limit: u32,
    /// Rate limiter state.
    pub rate_limiter: RateLimiter,
    /// AI provider manager.
    pub ai: AiManager,
    /// Server start time, for the health endpoint's uptime field.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            pool,
            session_ttl_days: config.session.ttl_days,
            default_rate_limit: config.rate_limit.default_limit,
            auth_rate_limit: config.rate_limit.auth_limit,
            rate_limiter: RateLimiter::new(),
            ai: AiManager::from_config(&config.ai),
            started_at: Instant::now(),
        }
    }
}

/// An API failure: status code plus the JSON error body every endpoint
/// uses.
pub type ApiError = (StatusCode, Json<Value>);

/// Builds the standard JSON error response.
pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "success": false, "error": message })))
}

/// Runs a blocking closure (DB work) on the blocking thread pool,
/// mapping join failures to a 500.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task join error");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    })?
}

/// Gets a pooled connection inside a blocking closure.
pub(crate) fn blocking_conn(
    pool: &DbPool,
) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, ApiError> {
    pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    })
}

/// Records a history entry, logging instead of failing: the audit trail
/// must never take an otherwise-successful request down with it.
pub(crate) fn record_history_or_log(
    conn: &rusqlite::Connection,
    user_id: i64,
    action: textlens_types::HistoryAction,
    details: Value,
) {
    if let Err(e) = textlens_records::record_history(conn, user_id, action, &details) {
        tracing::warn!(
            error = %e,
            action = action.as_str(),
            "failed to record history entry"
        );
    }
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "ai": {
            "configured": state.ai.is_configured(),
            "providers": state.ai.configured_providers(),
        },
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/me", get(api_auth::me_handler))
        .route(
            "/api/auth/change-password",
            post(api_auth::change_password_handler),
        )
        .route("/api/analyze", post(api_analyze::analyze_handler))
        .route(
            "/api/analyze/batch",
            post(api_analyze::batch_analyze_handler),
        )
        .route("/api/ai/analyze", post(api_ai::ai_analyze_handler))
        .route(
            "/api/favorites",
            get(api_favorites::list_favorites_handler)
                .post(api_favorites::add_favorite_handler)
                .delete(api_favorites::delete_favorite_handler),
        )
        .route(
            "/api/history",
            get(api_history::list_history_handler)
                .delete(api_history::clear_history_handler),
        )
        .route("/api/dashboard", get(api_dashboard::dashboard_handler))
        // Auth must wrap rate limiting so the limiter sees CurrentUser
        // and buckets authenticated traffic per user, not per IP.
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(axum::middleware::from_fn(
            middleware::session_auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(api_auth::register_handler))
        .route("/api/auth/login", post(api_auth::login_handler))
        .route("/api/auth/logout", post(api_auth::logout_handler))
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware));

    let router = public_routes.merge(protected_routes);

    // Serve client static files if the directory exists.
    // Configured via TEXTLENS_CLIENT_DIR env var; defaults to "client/dist".
    let client_dir =
        std::env::var("TEXTLENS_CLIENT_DIR").unwrap_or_else(|_| "client/dist".to_string());
    let router = if std::path::Path::new(&client_dir).join("index.html").exists() {
        tracing::info!(path = %client_dir, "serving client static files");
        let index = format!("{}/index.html", client_dir);
        router.fallback_service(ServeDir::new(&client_dir).fallback(ServeFile::new(index)))
    } else {
        tracing::info!(path = %client_dir, "client directory not found, skipping static file serving");
        router
    };

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
