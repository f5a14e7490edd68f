//! Service configuration.
//!
//! Configuration is resolved once at process start (CLI flags first,
//! environment variables as fallback) and injected into each
//! component at construction. Nothing reads ambient process state
//! after startup.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Environment variable naming the store connection URL.
pub const STORE_URL_ENV: &str = "PROPCALC_STORE_URL";

/// Environment variable naming the password hashing secret.
pub const AUTH_SECRET_ENV: &str = "PROPCALC_AUTH_SECRET";

/// Configuration for the account service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// API listen address.
    pub listen_addr: SocketAddr,
    /// Store connection URL (e.g. `redis://localhost:6379`).
    pub store_url: String,
    /// Server-side password hashing secret. Empty falls back to the
    /// compiled-in default, which is only acceptable in development.
    pub auth_secret: String,
    /// Log level.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".parse().expect("valid default address"),
            store_url: String::new(),
            auth_secret: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Fills unset fields from the environment.
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.store_url.is_empty() {
            if let Ok(url) = std::env::var(STORE_URL_ENV) {
                self.store_url = url.trim().trim_matches(['"', '\'']).to_string();
            }
        }
        if self.auth_secret.is_empty() {
            if let Ok(secret) = std::env::var(AUTH_SECRET_ENV) {
                self.auth_secret = secret;
            }
        }
        self
    }
}
