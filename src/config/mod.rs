//! Configuration module for the Porto API gateway.
//!
//! The store URL and service credential are required; everything else has a
//! sensible default.

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend store (also hosts the identity provider)
    pub store_url: String,
    /// Service-role credential for the backend store
    pub service_key: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing required variables abort startup.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let store_url = env::var("PORTO_STORE_URL")
            .expect("PORTO_STORE_URL must be set")
            .trim_end_matches('/')
            .to_string();

        let service_key = env::var("PORTO_SERVICE_KEY").expect("PORTO_SERVICE_KEY must be set");

        let bind_addr = env::var("PORTO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .expect("Invalid PORTO_BIND_ADDR format");

        let log_level = env::var("PORTO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            store_url,
            service_key,
            bind_addr,
            log_level,
        }
    }
}
