//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply pending migrations on start-up
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    20
}

fn default_run_migrations() -> bool {
    true
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT token expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: i64,
}

fn default_jwt_expiration() -> i64 {
    1800
}

/// How a booking-level coupon discount is written onto the tickets of each leg
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscountAllocation {
    /// Spread the discount over the legs so the ticket prices add up to the amount paid
    #[default]
    Prorate,
    /// Record the undiscounted leg subtotal on every ticket
    LegSubtotal,
}

/// Booking engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Discount bookkeeping for multi-leg bookings
    #[serde(default)]
    pub discount_allocation: DiscountAllocation,

    /// Smallest accepted "add funds" amount
    #[serde(default = "default_min_deposit")]
    pub min_deposit: Decimal,

    /// Largest accepted "add funds" amount
    #[serde(default = "default_max_deposit")]
    pub max_deposit: Decimal,
}

fn default_min_deposit() -> Decimal {
    Decimal::ONE
}

fn default_max_deposit() -> Decimal {
    Decimal::from(10_000)
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            discount_allocation: DiscountAllocation::default(),
            min_deposit: default_min_deposit(),
            max_deposit: default_max_deposit(),
        }
    }
}

/// Logging output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Level used for the workspace crates when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 20)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.jwt_expiration_secs", 1800)?
            .set_default("booking.discount_allocation", "prorate")?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with BUSLINE_ prefix
            .add_source(
                Environment::with_prefix("BUSLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("BUSLINE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
