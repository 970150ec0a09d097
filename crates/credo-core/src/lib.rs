//! Credo Core - user model, credential storage, and shared configuration
//!
//! This crate defines the persistence side of the credo authentication service:
//! - The `User` identity record
//! - The `CredentialStore` trait and its typed `StoreError` outcomes
//! - A PostgreSQL store (SQLx) and an in-memory store
//! - An injectable `Clock`
//! - Configuration management

pub mod clock;
pub mod config;
pub mod memory;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use memory::MemoryCredentialStore;
pub use store::{CredentialStore, PgCredentialStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User
// ============================================================================

/// Identity record as persisted in the `users` table
///
/// `password_hash` is never serialized outward; responses go through a
/// public projection in the API crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Immutable identifier assigned at creation
    pub id: Uuid,

    /// Login key, unique across all users (case-sensitive as stored)
    pub email: String,

    /// PHC-format password digest
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutating operation
    pub updated_at: DateTime<Utc>,
}
