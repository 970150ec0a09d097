//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::auth;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the credential routes
///
/// `/auth/*` is public; `/api/v1/users/*` requires a bearer token.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    let protected_routes = Router::new()
        .route(
            "/profile",
            get(auth::get_profile_handler).put(auth::update_profile_handler),
        )
        .route("/change-password", post(auth::change_password_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1/users", protected_routes)
}
