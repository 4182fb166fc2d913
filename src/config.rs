//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a
//! type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string. Without it the
///   server keeps all data in memory.
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `EXPIRY_SWEEP_INTERVAL_SECS` (optional): how often due reservations are
///   expired, defaults to 60
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Loads an optional `.env` file first, then reads the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed into
    /// its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are converted: server_port -> SERVER_PORT
        envy::from_env::<Config>()
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_secs.max(1))
    }
}
