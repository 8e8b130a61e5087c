//! Subtrack Web Server
//!
//! Axum-based JSON API for Subtrack.
//!
//! Security features:
//! - Bearer API-key authentication (secure by default, use --no-auth for local dev)
//! - Separate cron secret for the scheduled alert trigger
//! - Restrictive CORS policy
//! - Per-user rate limit on manual alert sends
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use subtrack_core::alerts::{AlertScheduler, AlertTransport};
use subtrack_core::clock::{Clock, SystemClock};
use subtrack_core::config::AppConfig;
use subtrack_core::currency::StaticRates;
use subtrack_core::db::Database;
use subtrack_core::models::User;
use subtrack_core::rate_limit::RateLimiter;
use subtrack_core::AnalyticsAggregator;

mod handlers;
mod scheduler;

pub use scheduler::{start_alert_scheduler, until_next_run};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Longest look-ahead accepted by /api/upcoming
pub const MAX_UPCOMING_DAYS: i64 = 366;

/// Header selecting the user an API call acts for
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Paths that do their own authentication (or need none)
const AUTH_EXEMPT_PATHS: &[&str] = &["/api/health", "/api/alerts/cron"];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>"
    pub api_keys: Vec<String>,
    /// Secret the external scheduler presents on /api/alerts/cron
    pub cron_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            cron_secret: None,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub settings: AppConfig,
    pub transport: Arc<dyn AlertTransport>,
    pub clock: Arc<dyn Clock>,
    pub rates: StaticRates,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        settings: AppConfig,
        transport: Arc<dyn AlertTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rates = StaticRates::from_settings(&settings.currency);
        Self {
            db,
            config,
            settings,
            transport,
            clock,
            rates,
        }
    }

    /// Alert scheduler wired to this state's store, transport and clock
    pub fn alert_scheduler(&self) -> AlertScheduler {
        let alerts = &self.settings.alerts;
        AlertScheduler::new(
            Arc::new(self.db.clone()),
            self.transport.clone(),
            self.clock.clone(),
        )
        .with_send_timeout(alerts.send_timeout)
        .with_manual_limit(
            RateLimiter::new(alerts.manual_limit, alerts.manual_window),
            Arc::new(self.db.clone()),
        )
    }

    pub fn aggregator(&self) -> AnalyticsAggregator {
        AnalyticsAggregator::new(
            self.settings.alerts.top_n,
            self.settings.alerts.upcoming_days,
        )
    }
}

/// Authentication middleware - validates the bearer API key
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
/// The cron endpoint checks its own secret and is skipped here.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth || AUTH_EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let api_key_valid = bearer_token(request.headers())
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    AppError::unauthorized("Authentication required").into_response()
}

/// The token from an "Authorization: Bearer <token>" header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
pub(crate) fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Identify the caller for audit logging
///
/// Returns "user:<id>" when a user is selected, "api-key" for key auth
/// without a user, or "local-dev" for unauthenticated requests.
pub fn get_actor(headers: &HeaderMap) -> String {
    if let Some(id) = selected_user_id(headers) {
        return format!("user:{}", id);
    }
    if bearer_token(headers).is_some() {
        return "api-key".to_string();
    }
    "local-dev".to_string()
}

fn selected_user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Load the user selected by the `X-User-Id` header
pub(crate) fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::bad_request("X-User-Id header required"))?;
    let id = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::bad_request("X-User-Id must be an integer"))?;

    state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::not_found(&format!("User {} not found", id)))
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    db: Database,
    config: ServerConfig,
    settings: AppConfig,
    transport: Arc<dyn AlertTransport>,
) -> Router {
    create_router_with_clock(db, config, settings, transport, Arc::new(SystemClock))
}

/// Create the application router with an explicit clock (for testing)
pub fn create_router_with_clock(
    db: Database,
    config: ServerConfig,
    settings: AppConfig,
    transport: Arc<dyn AlertTransport>,
    clock: Arc<dyn Clock>,
) -> Router {
    let state = Arc::new(AppState::new(db, config, settings, transport, clock));
    build_router(state)
}

fn build_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Current user
        .route("/me", get(handlers::get_me).put(handlers::update_me))
        // Subscriptions
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .put(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        // Views
        .route("/calendar", get(handlers::get_calendar))
        .route("/upcoming", get(handlers::get_upcoming))
        .route("/analytics", get(handlers::get_analytics))
        // Alerts
        .route("/alerts/cron", get(handlers::run_cron_alerts))
        .route("/alerts/send/:id", post(handlers::send_alert))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let allowed_headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::HeaderName::from_static(USER_ID_HEADER),
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
    settings: AppConfig,
    transport: Arc<dyn AlertTransport>,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!("No API keys configured; every authenticated route will return 401");
    }
    if config.cron_secret.is_none() {
        warn!("No cron secret configured; /api/alerts/cron is unavailable");
    }

    let state = Arc::new(AppState::new(
        db,
        config,
        settings,
        transport,
        Arc::new(SystemClock),
    ));

    match state.settings.alerts.daily_run_hour_utc {
        Some(hour) => start_alert_scheduler(state.clone(), hour),
        None => info!("Built-in daily alert run disabled; relying on the cron endpoint"),
    }

    let app = build_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        // Never resolve; keep serving
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
    retry_after: Option<Duration>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
            retry_after: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn too_many_requests(msg: &str, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, msg)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        let mut response = (self.status, body).into_response();
        if let Some(retry) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&retry.as_secs().to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<subtrack_core::Error> for AppError {
    fn from(err: subtrack_core::Error) -> Self {
        use subtrack_core::Error;

        match err {
            Error::NotFound(what) => Self::not_found(&format!("{} not found", what)),
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::RateLimited(msg) => Self::too_many_requests(&msg, None),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(other.into()),
                retry_after: None,
            },
        }
    }
}

#[cfg(test)]
mod tests;
