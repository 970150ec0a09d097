//! Credo API - HTTP surface of the credential service
//!
//! Exposes registration, login, and profile endpoints over axum, together with
//! health probes, Prometheus metrics, and an OpenAPI document.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use credo_core::{AppConfig, Clock, MemoryCredentialStore, ServerConfig, SystemClock};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for every public endpoint
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credo API",
        description = "User registration, login, and bearer-token protected profile management"
    ),
    paths(
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::get_profile_handler,
        handlers::auth::update_profile_handler,
        handlers::auth::change_password_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::UpdateProfileRequest,
        auth::ChangePasswordRequest,
        auth::UserPublic,
        auth::AuthResponse,
        auth::MessageResponse,
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Profile of the authenticated user"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let cors = cors_layer(server);
    let timeout = TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .merge(routes::api_routes(state.clone()))
        .fallback(handlers::health::not_found)
        .layer(timeout)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// CORS policy from configuration; no configured origins means any origin
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Secret used by [`test_state`]
pub const TEST_JWT_SECRET: &str = "credo-test-secret";

/// In-memory state with cheap hashing, for integration tests
pub fn test_state(clock: Arc<dyn Clock>) -> Result<Arc<AppState>, prometheus::Error> {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

    let state = AppState::new(
        config,
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(auth::Argon2Hasher::new(auth::PasswordConfig::fast_for_tests())),
        clock,
    )?;
    Ok(Arc::new(state))
}

/// Router over [`test_state`] with the system clock
pub fn create_router_for_testing() -> Result<Router, prometheus::Error> {
    Ok(create_router(test_state(Arc::new(SystemClock))?))
}
