//! API error handling
//!
//! Maps typed service outcomes onto HTTP status codes and a uniform JSON body.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::auth::AuthError;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Outcome of an authentication operation
    Auth(AuthError),
    /// Request body missing, malformed, or of the wrong shape
    InvalidRequest(String),
    /// Request body failed field validation
    Validation(String),
    /// Missing or malformed Authorization header
    Unauthorized(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::Auth(err) => auth_error_response(err),
            AppError::InvalidRequest(details) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_REQUEST", "Invalid request format")
                    .with_details(details.clone()),
            ),
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("VALIDATION_ERROR", "Request validation failed")
                    .with_details(details.clone()),
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::unauthorized(msg.clone()))
            }
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", format!("{msg} not found")),
            ),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error()),
        }
    }
}

fn auth_error_response(err: &AuthError) -> (StatusCode, ApiError) {
    match err {
        AuthError::UserExists => (
            StatusCode::CONFLICT,
            ApiError::new("USER_EXISTS", "A user with this email already exists"),
        ),
        AuthError::UserNotFound => (
            StatusCode::NOT_FOUND,
            ApiError::new("USER_NOT_FOUND", "User not found"),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            ApiError::new("INVALID_CREDENTIALS", "Invalid email or password"),
        ),
        AuthError::InvalidCurrentPassword => (
            StatusCode::BAD_REQUEST,
            ApiError::new("INVALID_CURRENT_PASSWORD", "Current password is incorrect"),
        ),
        AuthError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            ApiError::new("TOKEN_EXPIRED", "Token has expired"),
        ),
        AuthError::TokenInvalid => (
            StatusCode::UNAUTHORIZED,
            ApiError::new("TOKEN_INVALID", "Invalid token"),
        ),
        AuthError::HashingError(_) | AuthError::TokenIssue(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
        }
        AuthError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();

        // Internal details stay in the logs
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "Request failed");
        }

        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// JSON body extractor whose rejections use the [`ApiError`] body
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{field}: {}", messages.join(", "))
            })
            .collect();
        fields.sort();

        AppError::Validation(fields.join("; "))
    }
}
