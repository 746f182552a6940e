//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `API_KEY`: Shared secret required on every mutating request (no default)
//! - `AUTH_FAILURE_LIMIT`: Failed key attempts per minute per client before lockout (default: 10, 0 = off)
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins (default: `*` for dev)
//! - `TRUSTED_PROXIES`: Comma-separated CIDR ranges whose `X-Forwarded-For` /
//!   `X-Real-IP` headers identify the client (default: none, headers ignored)
//!
//! # Listing
//!
//! - `DEFAULT_PAGE_LIMIT`: Page size when `limit` is omitted (default: 2)
//! - `MAX_PAGE_LIMIT`: Largest accepted `limit` (default: 100)

use std::env;

use crate::error::{AppError, AppResult};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 64KB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Shared secret expected in the `X-API-Key` header of mutating requests
    pub api_key: String,

    /// Failed authentication attempts allowed per client per minute (0 = unlimited)
    pub auth_failure_limit: u32,

    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    pub cors_allowed_origins: Vec<String>,

    /// CIDR ranges of reverse proxies allowed to report the client address
    /// (empty = forwarding headers are ignored)
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Catalog Configuration
    // =========================================================================
    /// Page size applied when a listing omits `limit` (default: 2)
    pub default_page_limit: usize,

    /// Largest `limit` a listing may request (default: 100)
    pub max_page_limit: usize,

    /// Seed the store with sample products at startup (default: true)
    pub seed_sample_data: bool,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log output format (default: text)
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if `API_KEY` is missing or any value
    /// fails to parse or validate.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_key = env::var("API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::ConfigError("API_KEY must be set".to_string()))?;

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 64 * 1024)?,

            // Security
            api_key,
            auth_failure_limit: Self::parse_env("AUTH_FAILURE_LIMIT", 10)?,
            cors_allowed_origins: Self::parse_cors_origins(),
            trusted_proxies: Self::parse_list("TRUSTED_PROXIES"),

            // Catalog
            default_page_limit: Self::parse_env("DEFAULT_PAGE_LIMIT", 2)?,
            max_page_limit: Self::parse_env("MAX_PAGE_LIMIT", 100)?,
            seed_sample_data: Self::parse_env("SEED_SAMPLE_DATA", true)?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Text)?,
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.is_empty() {
            return Err(AppError::ConfigError(
                "API_KEY must not be empty".to_string(),
            ));
        }

        if self.default_page_limit == 0 {
            return Err(AppError::ConfigError(
                "DEFAULT_PAGE_LIMIT must be greater than 0".to_string(),
            ));
        }

        if self.max_page_limit < self.default_page_limit {
            return Err(AppError::ConfigError(format!(
                "MAX_PAGE_LIMIT ({}) must be >= DEFAULT_PAGE_LIMIT ({})",
                self.max_page_limit, self.default_page_limit
            )));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated list, dropping blank entries.
    fn parse_list(name: &str) -> Vec<String> {
        env::var(name)
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead. The default
/// key is a placeholder; never ship it.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 64 * 1024,
            // Security
            api_key: "dev-api-key".to_string(),
            auth_failure_limit: 10,
            cors_allowed_origins: vec!["*".to_string()],
            trusted_proxies: Vec::new(),
            // Catalog
            default_page_limit: 2,
            max_page_limit: 100,
            seed_sample_data: true,
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: 0,
        }
    }
}
