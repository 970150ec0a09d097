//! Security audit logging for credential events
//!
//! Every registration, login, profile change, password change and rejected
//! token is recorded on the `audit` tracing target, separate from the
//! application logs.
//!
//! Login failures carry the internal reason (`unknown_email` or
//! `wrong_password`). Callers of the API only ever see
//! "invalid email or password"; the distinction exists solely here.
//!
//! # Example
//!
//! ```ignore
//! use credo_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Why a login attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginFailureReason {
    UnknownEmail,
    WrongPassword,
}

impl LoginFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownEmail => "unknown_email",
            Self::WrongPassword => "wrong_password",
        }
    }
}

/// Security audit events for the credential lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
    },

    /// Rejected registration (duplicate email or infrastructure failure)
    RegistrationFailure {
        email: String,
        reason: String,
    },

    LoginSuccess {
        user_id: Uuid,
        email: String,
    },

    LoginFailure {
        email: String,
        reason: LoginFailureReason,
    },

    ProfileUpdated {
        user_id: Uuid,
        email: String,
    },

    PasswordChanged {
        user_id: Uuid,
    },

    /// Current password did not verify
    PasswordChangeFailure {
        user_id: Uuid,
    },

    /// Bearer token rejected by the middleware
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

impl AuditEvent {
    /// Snake-case event name, matching the serialized `event_type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RegistrationSuccess { .. } => "registration_success",
            Self::RegistrationFailure { .. } => "registration_failure",
            Self::LoginSuccess { .. } => "login_success",
            Self::LoginFailure { .. } => "login_failure",
            Self::ProfileUpdated { .. } => "profile_updated",
            Self::PasswordChanged { .. } => "password_changed",
            Self::PasswordChangeFailure { .. } => "password_change_failure",
            Self::InvalidToken { .. } => "invalid_token",
        }
    }

    /// Whether the event records a refused operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::RegistrationFailure { .. }
                | Self::LoginFailure { .. }
                | Self::PasswordChangeFailure { .. }
                | Self::InvalidToken { .. }
        )
    }

    fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::RegistrationSuccess { user_id, .. }
            | Self::LoginSuccess { user_id, .. }
            | Self::ProfileUpdated { user_id, .. }
            | Self::PasswordChanged { user_id }
            | Self::PasswordChangeFailure { user_id } => Some(*user_id),
            _ => None,
        }
    }
}

/// Log a security audit event on the `audit` target
///
/// Successful events are logged at INFO, refused ones at WARN. The full event
/// is attached as a JSON string for log aggregators.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));
    let event_type = event.event_type();
    let user_id = event.user_id();

    if event.is_failure() {
        warn!(
            target: "audit",
            timestamp = %timestamp,
            event_type,
            user_id = ?user_id,
            event = %event_json,
            "Credential operation refused"
        );
    } else {
        info!(
            target: "audit",
            timestamp = %timestamp,
            event_type,
            user_id = ?user_id,
            event = %event_json,
            "Credential operation succeeded"
        );
    }
}

/// Extract the client IP address from proxy headers
///
/// Checks X-Forwarded-For (first hop) and then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
