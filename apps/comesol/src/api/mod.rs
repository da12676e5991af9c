//! # COMESOL HTTP API Module
//!
//! JSON API for the cadastro front end, using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /connection` - Backend reachability
//! - `POST /cpf/validate` - CPF checksum
//! - `POST /login` - Password sign-in and routing decision
//! - `GET /login/oauth/google` - OAuth start URL
//! - `POST /logout` - End the session
//! - `GET /session` - Signed-in user
//! - `GET /route[?page=/path]` - Where the session belongs, or where a page request ends up
//! - `POST /cadastro` - Save group and members
//! - `GET /visualizacao` - Saved group and members
//! - `DELETE /members/{id}` - Remove a member
//! - `POST /visualizacao/save` - Confirm the registration
//!
//! Protected endpoints take `Authorization: Bearer <access-token>`.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{BearerToken, bearer_token};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, CadastroRequest, ConnectionResponse, CpfRequest, CpfResponse, DeleteResponse,
    ErrorResponse, HealthResponse, LoginRequest, LoginResponse, OAuthQuery, OAuthResponse,
    RedirectResponse, RouteQuery, SessionResponse, ViewResponse,
};

use crate::config::ServerConfig;
use crate::service::RegistrationService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use comesol_core::CadastroError;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request bodies above this are rejected with 413.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<RegistrationService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: RegistrationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: every origin
/// - empty: localhost only
/// - otherwise: the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

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
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Localhost origins, including the Vite dev server.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/connection", get(handlers::connection_handler))
        .route("/cpf/validate", post(handlers::validate_cpf_handler))
        .route("/login", post(handlers::login_handler))
        .route("/login/oauth/google", get(handlers::oauth_google_handler))
        .route("/logout", post(handlers::logout_handler))
        .route("/session", get(handlers::session_handler))
        .route("/route", get(handlers::route_handler))
        .route("/cadastro", post(handlers::cadastro_handler))
        .route("/visualizacao", get(handlers::view_handler))
        .route("/visualizacao/save", post(handlers::save_all_handler))
        .route("/members/{id}", delete(handlers::delete_member_handler));

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    service: RegistrationService,
    config: &ServerConfig,
) -> Result<(), CadastroError> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = create_router(AppState::new(service), config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CadastroError::IoError(format!("Bind failed: {e}")))?;

    tracing::info!("COMESOL HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| CadastroError::IoError(format!("Server error: {e}")))
}
