//! Authentication API handlers
//!
//! Provides HTTP endpoints for registration, login, and profile management.
//! Bodies are parsed and validated here; everything else is delegated to [`AuthService`](crate::auth::AuthService).

use crate::auth::{
    AuthResponse, AuthenticatedUser, ChangePasswordRequest, LoginRequest, MessageResponse,
    RegisterRequest, UpdateProfileRequest, UserPublic,
};
use crate::error::{ApiError, ApiJson, AppError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

/// Register a new user account
///
/// Creates a user and returns it with a bearer token.
///
/// # Responses
///
/// * `201 Created` - User registered, token issued
/// * `400 Bad Request` - Invalid email, password shorter than 6, or empty name
/// * `409 Conflict` - Email already registered
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 503, description = "Credential store unavailable", body = ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let response = state
        .auth
        .register(&request.email, &request.password, &request.name)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns a token
/// * `401 Unauthorized` - Unknown email or wrong password (not distinguished)
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError),
        (status = 503, description = "Credential store unavailable", body = ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    request.validate()?;

    let response = state.auth.login(&request.email, &request.password).await?;

    Ok(Json(response))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = UserPublic),
        (status = 401, description = "Missing, invalid or expired token", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserPublic>, AppError> {
    let profile = state.auth.get_profile(user.user_id).await?;
    Ok(Json(profile))
}

/// Update name and email of the current user
#[utoipa::path(
    put,
    path = "/api/v1/users/profile",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserPublic),
        (status = 400, description = "Invalid input", body = ApiError),
        (status = 401, description = "Missing, invalid or expired token", body = ApiError),
        (status = 404, description = "User no longer exists", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserPublic>, AppError> {
    request.validate()?;

    let profile = state
        .auth
        .update_profile(user.user_id, &request.name, &request.email)
        .await?;

    Ok(Json(profile))
}

/// Change the password of the current user
///
/// Previously issued tokens remain valid until they expire.
#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid input or wrong current password", body = ApiError),
        (status = 401, description = "Missing, invalid or expired token", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;

    state
        .auth
        .change_password(user.user_id, &request.old_password, &request.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}
