//! Authentication module
//!
//! This module provides the credential lifecycle:
//! - Password hashing with Argon2id
//! - Bearer token issuance and verification (HS256)
//! - The authentication service (register, login, profile, password change)
//! - Typed error outcomes
//! - Middleware for request authentication

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use error::AuthError;
pub use jwt::{Claims, IssuedToken, JwtError, TokenIssuer};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UpdateProfileRequest, UserPublic,
};
pub use password::{Argon2Hasher, PasswordConfig, PasswordError, PasswordHasher};
pub use service::AuthService;
