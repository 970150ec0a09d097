//! Application state management

use credo_core::config::AppConfig;
use credo_core::{Clock, CredentialStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthService, PasswordHasher, TokenIssuer};
use crate::middleware::metrics::HttpMetrics;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Credential operations
    pub auth: AuthService,
    /// HTTP metrics registry
    pub metrics: HttpMetrics,
    /// Server start time
    pub start_time: Instant,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Wire the service from its collaborators
    pub fn new(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, prometheus::Error> {
        let tokens = Arc::new(TokenIssuer::with_clock(&config.auth, clock));
        let auth = AuthService::new(store, hasher, tokens);

        Ok(Self {
            config,
            auth,
            metrics: HttpMetrics::new()?,
            start_time: Instant::now(),
            is_ready: AtomicBool::new(true),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is accepting traffic
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
