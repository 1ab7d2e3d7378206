//! # Vouch HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Registry status
//! - `POST /items` - Submit an item
//! - `GET /items/{id}` / `DELETE /items/{id}` - Lookup / remove an item
//! - `POST /items/{id}/appraisals` - Cast or replace an appraisal
//! - `GET /items/{id}/appraisals/{participant}` - One participant's appraisal
//! - `POST /items/{id}/rewards` - Tip the originator
//! - `POST /items/{id}/flags` - Flag an item
//! - `GET /top` - Non-negative items in the top window
//! - `GET /reputation/{participant}` - Participant reputation
//! - `GET /topics` / `POST /topics` - Topic catalog
//! - `GET /charge` / `PUT /charge` - Submission charge
//! - `GET /events` - Event journal
//! - `GET /balances/{participant}` - Native balance
//! - `POST /export` - Snapshot export
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `VOUCH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `VOUCH_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `VOUCH_CALLER_RATE_LIMIT`: Requests per second per caller (default: 20, 0 to disable)
//! - `VOUCH_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use handlers::{CALLER_HEADER, error_status};
pub use middleware::{
    RateLimits, create_caller_rate_limiter, create_rate_limiter, get_caller_rate_limit_from_env,
    get_rate_limit_from_env,
};
pub use types::{
    AppraisalResponse, AppraiseRequest, BalanceResponse, ChargeRequest, ChargeResponse, EventJson,
    EventsResponse, ExportResponse, HealthResponse, ItemJson, ItemResponse, MutationResponse,
    ReputationResponse, RewardRequest, StatusResponse, SubmitRequest, TopResponse, TopicRequest,
    TopicsResponse,
};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vouch_core::{Session, VouchError};

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the registry session.
#[derive(Clone)]
pub struct AppState {
    /// The session containing the registry.
    pub session: Arc<RwLock<Session>>,
    /// Logical clock handed to the core as the call height.
    clock: Arc<AtomicU64>,
}

impl AppState {
    /// Create new app state with a session.
    ///
    /// The clock resumes from the last committed height so heights stay
    /// monotonic across restarts of a persistent registry.
    pub fn new(session: Session) -> Result<Self, VouchError> {
        let height = session.last_height()?;
        Ok(Self {
            session: Arc::new(RwLock::new(session)),
            clock: Arc::new(AtomicU64::new(height)),
        })
    }

    /// Advance the clock and return the new height.
    ///
    /// Callers hold the session write lock, so heights follow commit order.
    pub(crate) fn tick(&self) -> u64 {
        let previous = self
            .clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(1))
            })
            .unwrap_or_else(|h| h);
        previous.saturating_add(1)
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

fn cors_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(CALLER_HEADER),
    ]
}

/// Build CORS layer from `VOUCH_CORS_ORIGINS`.
///
/// `*` allows every origin, an unset variable allows localhost only,
/// anything else is parsed as a comma-separated origin list.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("VOUCH_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (VOUCH_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in VOUCH_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers(cors_headers())
            }
        }
        None => {
            tracing::info!("CORS: No VOUCH_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(cors_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - global and per-caller buckets (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let caller_limit = get_caller_rate_limit_from_env();
    let limits = if rate_limit > 0 {
        tracing::info!(
            "Rate limiting enabled: {} requests/second, {} per caller",
            rate_limit,
            caller_limit
        );
        Some(RateLimits {
            global: create_rate_limiter(rate_limit),
            per_caller: (caller_limit > 0).then(|| create_caller_rate_limiter(caller_limit)),
        })
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - any client can act as any caller! \
             Set VOUCH_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/items", post(handlers::submit_handler))
        .route(
            "/items/{id}",
            get(handlers::get_item_handler).delete(handlers::remove_handler),
        )
        .route("/items/{id}/appraisals", post(handlers::appraise_handler))
        .route(
            "/items/{id}/appraisals/{participant}",
            get(handlers::get_appraisal_handler),
        )
        .route("/items/{id}/rewards", post(handlers::reward_handler))
        .route("/items/{id}/flags", post(handlers::flag_handler))
        .route("/top", get(handlers::top_handler))
        .route("/reputation/{participant}", get(handlers::reputation_handler))
        .route(
            "/topics",
            get(handlers::topics_handler).post(handlers::add_topic_handler),
        )
        .route(
            "/charge",
            get(handlers::charge_handler).put(handlers::set_charge_handler),
        )
        .route("/events", get(handlers::events_handler))
        .route("/balances/{participant}", get(handlers::balance_handler))
        .route("/export", post(handlers::export_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limits) = limits {
        router = router.layer(axum_middleware::from_fn_with_state(
            limits,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, session: Session) -> Result<(), VouchError> {
    let state = AppState::new(session)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VouchError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Vouch HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VouchError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use vouch_core::{Balances, Genesis, Participant};

    fn state() -> AppState {
        let session = Session::new(
            Balances::new(),
            Genesis::new(Participant::new("admin")).with_charge(0),
        )
        .expect("session");
        AppState::new(session).expect("state")
    }

    #[test]
    fn clock_ticks_from_last_height() {
        let state = state();
        assert_eq!(state.tick(), 1);
        assert_eq!(state.tick(), 2);
        assert_eq!(state.clone().tick(), 3);
    }

    #[tokio::test]
    async fn health_route_answers_oneshot() {
        let router = create_router(state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
