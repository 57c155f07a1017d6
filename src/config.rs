//! Configuration management for the labeling server.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `LABELER_` prefix (a `.env` file is loaded first)
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use element_labeler::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.backend.api_url),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `LABELER_HOST` - Server bind address (default: 0.0.0.0)
//! - `LABELER_PORT` - Server port (default: 5001)
//! - `LABELER_API_URL` - Upstream annotation API base URL (required)
//! - `LABELER_DATABASE_URL` - `postgres://...` or `memory://` (required)
//! - `LABELER_DATABASE_NAME` - Schema holding users and tokens (default: labeler)
//! - `LABELER_DATA_DIR` - Directory of the JSON collections (default: .)
//! - `LABELER_STATIC_DIR` - Static assets directory (default: public)
//! - `LABELER_ENVIRONMENT` - `development` or `production` (default: development)
//! - `LABELER_SESSION_TTL_DAYS` - Token lifetime in days (default: 7)
//! - `LABELER_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::auth::{DEFAULT_SESSION_TTL_DAYS, MAX_SESSION_TTL_DAYS};
use crate::db::{is_valid_schema_name, DatabaseUrl};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default schema for users and tokens.
pub const DEFAULT_DATABASE_NAME: &str = "labeler";

/// Default directory of the JSON collections.
pub const DEFAULT_DATA_DIR: &str = ".";

/// Default static assets directory.
pub const DEFAULT_STATIC_DIR: &str = "public";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Element Labeler - annotation backend for labeling page elements.
#[derive(Parser, Debug, Clone)]
#[command(name = "element-labeler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Validate configuration and test database and upstream connectivity.
    Check(CheckConfig),
}

/// Deployment environment.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Settings shared by `serve` and `check`.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Base URL of the upstream annotation API.
    #[arg(long, env = "LABELER_API_URL")]
    pub api_url: String,

    /// Database connection string (`postgres://...` or `memory://`).
    #[arg(long, env = "LABELER_DATABASE_URL")]
    pub database_url: String,

    /// Database schema holding the users and auth_tokens tables.
    #[arg(long, default_value = DEFAULT_DATABASE_NAME, env = "LABELER_DATABASE_NAME")]
    pub database_name: String,

    /// Directory holding elements.json, labels and annotation files.
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "LABELER_DATA_DIR")]
    pub data_dir: PathBuf,
}

impl BackendArgs {
    /// Validate the shared settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err(
                "Upstream API URL is required. Set --api-url or LABELER_API_URL".to_string(),
            );
        }

        match Url::parse(&self.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(format!(
                    "Upstream API URL must use http or https, got '{}'",
                    url.scheme()
                ))
            }
            Err(e) => return Err(format!("Invalid upstream API URL '{}': {}", self.api_url, e)),
        }

        if self.database_url.trim().is_empty() {
            return Err(
                "Database URL is required. Set --database-url or LABELER_DATABASE_URL".to_string(),
            );
        }
        DatabaseUrl::parse(&self.database_url).map_err(|e| e.to_string())?;

        if !is_valid_schema_name(&self.database_name) {
            return Err(format!(
                "Invalid database name '{}': use letters, digits and underscores",
                self.database_name
            ));
        }

        if !self.data_dir.is_dir() {
            return Err(format!(
                "Data directory does not exist: {}",
                self.data_dir.display()
            ));
        }

        Ok(())
    }

    /// The parsed database URL (call validate() first).
    pub fn database(&self) -> Result<DatabaseUrl, String> {
        DatabaseUrl::parse(&self.database_url).map_err(|e| e.to_string())
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "LABELER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "LABELER_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Directory of static assets served for non-API paths.
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "LABELER_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Deployment environment.
    #[arg(long, value_enum, default_value_t = Environment::Development, env = "LABELER_ENVIRONMENT")]
    pub environment: Environment,

    // =========================================================================
    // Session Configuration
    // =========================================================================
    /// How long an auth token stays valid, in days.
    #[arg(long, default_value_t = DEFAULT_SESSION_TTL_DAYS, env = "LABELER_SESSION_TTL_DAYS")]
    pub session_ttl_days: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin (development only).
    #[arg(long, env = "LABELER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.backend.validate()?;

        if self.session_ttl_days == 0 {
            return Err("session_ttl_days must be greater than 0".to_string());
        }

        if self.session_ttl_days > MAX_SESSION_TTL_DAYS {
            return Err(format!(
                "session_ttl_days must be at most {} (got {})",
                MAX_SESSION_TTL_DAYS, self.session_ttl_days
            ));
        }

        if self.environment == Environment::Production {
            let wildcard = match &self.cors_origins {
                None => true,
                Some(origins) => origins.iter().any(|o| o.trim() == "*"),
            };
            if wildcard {
                return Err(
                    "Any-origin CORS is not allowed in production. \
                     Set --cors-origins or LABELER_CORS_ORIGINS to explicit origins"
                        .to_string(),
                );
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether debug logging is on, by flag or development mode.
    pub fn debug_logging(&self) -> bool {
        self.verbose || self.environment == Environment::Development
    }

    /// The session lifetime as a chrono duration.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.session_ttl_days))
    }
}

/// Configuration for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
