//! Typed outcomes of the authentication operations

use credo_core::StoreError;
use thiserror::Error;

use super::jwt::JwtError;
use super::password::PasswordError;

/// Every failure an [`AuthService`](super::AuthService) operation can return
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    /// Unknown email or wrong password; the two are never distinguished
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("current password is incorrect")]
    InvalidCurrentPassword,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token")]
    TokenInvalid,

    #[error("password hashing failed: {0}")]
    HashingError(String),

    #[error("token issuance failed: {0}")]
    TokenIssue(String),

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::UserExists,
            StoreError::NotFound => Self::UserNotFound,
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::Invalid(_) => Self::TokenInvalid,
            JwtError::Encoding(e) => Self::TokenIssue(e.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        Self::HashingError(err.to_string())
    }
}
