//! # Wizard HTTP API Module
//!
//! JSON API hosting many isolated wizard sessions over one shared machine
//! table.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never requires a key)
//! - `GET /machines` - Machine table summary
//! - `POST /sessions` - Open a session
//! - `GET /sessions/{id}` - Session state and pending intents
//! - `DELETE /sessions/{id}` - Close a session
//! - `PUT /sessions/{id}/features` - Save the feature plan
//! - `POST /sessions/{id}/tutorial` - Tutorial machine event
//! - `POST /sessions/{id}/feature` - Feature flow event
//! - `POST /sessions/{id}/route` - Report router navigation
//! - `POST /sessions/{id}/restart` - Start the tour over
//! - `GET /sessions/{id}/progress` - Progress figures
//!
//! Render and route intents produced by a request are returned in its
//! response; the API never acts on them.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::keys_match;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, CreateSessionRequest, ErrorResponse, EventRequest, FeaturesRequest, HealthResponse,
    MachineSummary, MachinesResponse, ProgressResponse, RouteRequest, SessionId, SessionResponse,
    TransitionResponse, parse_features,
};

use crate::config::{ApiConfig, Config};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vault_wizard_core::{Feature, MachineRegistry, WizardController, WizardError};

/// Request bodies are tiny; anything bigger is refused.
const MAX_BODY_SIZE: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MachineRegistry>,
    pub sessions: Arc<RwLock<BTreeMap<SessionId, WizardController>>>,
    pub next_id: Arc<AtomicU64>,
    pub max_sessions: usize,
    pub default_features: Arc<Vec<Feature>>,
    pub api: Arc<ApiConfig>,
}

impl AppState {
    /// State for `config`, with no sessions open.
    pub fn new(registry: Arc<MachineRegistry>, config: &Config) -> Result<Self, WizardError> {
        Ok(Self {
            registry,
            sessions: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            max_sessions: config.api.max_sessions,
            default_features: Arc::new(config.default_features()?),
            api: Arc::new(config.api.clone()),
        })
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `["*"]`: any origin
/// - `None`: localhost only
/// - otherwise: the listed origins (localhost only if none parse)
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([only]) if only == "*" => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                restricted_cors(allowed)
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:4200",
        "http://localhost:8080",
        "http://127.0.0.1:4200",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();
    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router(state: AppState) -> Router {
    let api = Arc::clone(&state.api);
    let cors = build_cors_layer(api.cors_origins.as_deref());

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/machines", get(handlers::machines_handler))
        .route("/sessions", post(handlers::create_session_handler))
        .route(
            "/sessions/{id}",
            get(handlers::get_session_handler).delete(handlers::delete_session_handler),
        )
        .route("/sessions/{id}/features", put(handlers::save_features_handler))
        .route("/sessions/{id}/tutorial", post(handlers::tutorial_event_handler))
        .route("/sessions/{id}/feature", post(handlers::feature_event_handler))
        .route("/sessions/{id}/route", post(handlers::route_handler))
        .route("/sessions/{id}/restart", post(handlers::restart_handler))
        .route("/sessions/{id}/progress", get(handlers::progress_handler));

    match &api.api_key {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: Arc<str> = Arc::from(key.as_str());
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set VAULT_WIZARD_API_KEY to enable authentication."
            );
        }
    }

    match create_rate_limiter(api.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", api.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    addr: &str,
    registry: Arc<MachineRegistry>,
    config: &Config,
) -> Result<(), WizardError> {
    let state = AppState::new(registry, config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WizardError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Vault wizard HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| WizardError::IoError(format!("Server error: {}", e)))
}
