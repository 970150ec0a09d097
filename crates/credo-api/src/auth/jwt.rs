//! JWT token issuance and verification
//!
//! Tokens are HMAC-SHA256 signed and stateless: validity is decided by the
//! signature, the issuer, and `exp` compared exactly against the injected clock.

use std::sync::Arc;

use credo_core::{AuthConfig, Clock, SystemClock, User};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure containing user identity
///
/// These claims are embedded in the access token and extracted during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// User ID
    pub user_id: Uuid,
    /// User's email address at issuance
    pub email: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Not before (Unix seconds)
    pub nbf: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// A freshly signed token with its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// Signs and verifies bearer tokens with a fixed secret and TTL
///
/// The secret, TTL and issuer are captured at construction and never change.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer that reads the wall clock
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl_secs: i64::try_from(config.token_ttl_secs).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a token for `user`, valid for the configured TTL from now
    pub fn issue(&self, user: &User) -> Result<IssuedToken, JwtError> {
        let now = self.clock.now().timestamp();
        let expires_at = now.saturating_add(self.ttl_secs);

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            iat: now,
            nbf: now,
            exp: expires_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, algorithm, issuer and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        // Only HS256 is accepted; "none" and asymmetric headers fail to decode
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Time checks run below against the injected clock with no leeway
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })?
            .claims;

        let now = self.clock.now().timestamp();
        if claims.exp <= now {
            return Err(JwtError::Expired);
        }
        if claims.nbf > now {
            return Err(JwtError::Invalid("token not yet valid".to_string()));
        }
        if claims.sub != claims.user_id.to_string() {
            return Err(JwtError::Invalid("subject mismatch".to_string()));
        }

        Ok(claims)
    }
}
