//! Application configuration management

use std::env;

use anyhow::{Context, Result};

use crate::app_mode::RunMode;

/// Six-field cron expression (with seconds): every six hours on the hour.
pub const DEFAULT_SCAN_SCHEDULE: &str = "0 0 */6 * * *";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path or `sqlite://` URL
    pub database_url: String,

    /// Maximum connections in the SQLite pool
    pub database_max_connections: u32,

    /// Cron expression for periodic scans in daemon mode
    pub scan_schedule: String,

    /// Run a scan immediately when the daemon starts
    pub scan_on_startup: bool,

    /// Scan once and exit, or stay resident
    pub run_mode: RunMode,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let database_url = lookup("DATABASE_PATH")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| "./data/tagscan.db".to_string());

        let run_mode = match lookup("RUN_MODE") {
            Some(value) => RunMode::from_arg(&value)
                .with_context(|| format!("Invalid RUN_MODE '{}'", value))?,
            None => RunMode::Daemon,
        };

        Ok(Self {
            database_url,

            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,

            scan_schedule: lookup("SCAN_SCHEDULE")
                .unwrap_or_else(|| DEFAULT_SCAN_SCHEDULE.to_string()),

            scan_on_startup: lookup("SCAN_ON_STARTUP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),

            run_mode,
        })
    }
}
