//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BRUNCH_DATABASE_URL` - `SQLite` URL (default: `sqlite://brunch.db?mode=rwc`)
//! - `BRUNCH_HOST` - Bind address (default: 0.0.0.0)
//! - `BRUNCH_PORT` - Listen port (default: 8082)
//! - `BRUNCH_BASE_URL` - Public URL; `https://` enables secure cookies
//!   (default: `http://localhost:8082`)
//! - `BRUNCH_CREDENTIALS_FILE` - Admin/DAPNET credential file (default: `.pwd`)
//! - `BRUNCH_RECURRENCE` - Event rule, e.g. `monthly:3:sun` or `weekly:sat`
//!   (default: `monthly:3:sun`)
//! - `BRUNCH_RESET_TIME` - Local time the roster is cleared on the event day
//!   (default: 15:00)
//! - `BRUNCH_RESET_POLL_SECS` - Reset job poll interval (default: 60)
//! - `BRUNCH_MAIL_RECIPIENTS` - Comma-separated addresses for the mailto link
//! - `BRUNCH_CATALOG_FILE` - Contribution items to seed, one per line
//! - `BRUNCH_STATIC_DIR` - Stylesheet directory (default: `crates/server/static`)
//!
//! ## DAPNET paging
//! - `DAPNET_URL` - API base URL (default: `https://hampager.de/api`)
//! - `DAPNET_CALLSIGNS` - Comma-separated callsigns to page
//! - `DAPNET_TRANSMITTER_GROUPS` - Comma-separated groups (default: all)
//!
//! ## Error tracking
//! - `SENTRY_DSN` - Sentry DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use secrecy::SecretString;
use thiserror::Error;

use brunch_core::Recurrence;

const DEFAULT_DATABASE_URL: &str = "sqlite://brunch.db?mode=rwc";
const DEFAULT_DAPNET_URL: &str = "https://hampager.de/api";
const DEFAULT_STATIC_DIR: &str = "crates/server/static";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable name and the reason its value was rejected.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Brunch server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SQLite` connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Path of the credential file
    pub credentials_file: PathBuf,
    /// Event recurrence rule
    pub recurrence: Recurrence,
    /// Local time of day the roster is cleared on the event date
    pub reset_time: NaiveTime,
    /// How often the reset job checks the clock
    pub reset_poll_interval: Duration,
    /// Recipients of the notification mail
    pub mail_recipients: Vec<String>,
    /// Optional file of contribution items to seed the catalog with
    pub catalog_file: Option<PathBuf>,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// DAPNET paging settings (credentials live in the credential file)
    pub dapnet: DapnetConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

/// DAPNET paging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DapnetConfig {
    /// API base URL
    pub url: String,
    /// Callsigns receiving the page
    pub callsigns: Vec<String>,
    /// Transmitter groups to send through
    pub transmitter_groups: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url =
            SecretString::from(env.or_default("BRUNCH_DATABASE_URL", DEFAULT_DATABASE_URL));
        let host = env.parse_or("BRUNCH_HOST", "0.0.0.0")?;
        let port = env.parse_or("BRUNCH_PORT", "8082")?;
        let base_url = env
            .or_default("BRUNCH_BASE_URL", "http://localhost:8082")
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BRUNCH_BASE_URL".to_string(), e.to_string())
        })?;

        let credentials_file = PathBuf::from(env.or_default("BRUNCH_CREDENTIALS_FILE", ".pwd"));
        let recurrence = env.parse_or("BRUNCH_RECURRENCE", "monthly:3:sun")?;
        let reset_time = NaiveTime::parse_from_str(
            &env.or_default("BRUNCH_RESET_TIME", "15:00"),
            "%H:%M",
        )
        .map_err(|e| ConfigError::InvalidEnvVar("BRUNCH_RESET_TIME".to_string(), e.to_string()))?;
        let poll_secs: u64 = env.parse_or("BRUNCH_RESET_POLL_SECS", "60")?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BRUNCH_RESET_POLL_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let mail_recipients = split_list(env.optional("BRUNCH_MAIL_RECIPIENTS").as_deref());
        let catalog_file = env.optional("BRUNCH_CATALOG_FILE").map(PathBuf::from);
        let static_dir = PathBuf::from(env.or_default("BRUNCH_STATIC_DIR", DEFAULT_STATIC_DIR));

        let dapnet = DapnetConfig {
            url: env.or_default("DAPNET_URL", DEFAULT_DAPNET_URL),
            callsigns: split_list(env.optional("DAPNET_CALLSIGNS").as_deref()),
            transmitter_groups: split_list(Some(
                &env.or_default("DAPNET_TRANSMITTER_GROUPS", "all"),
            )),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            credentials_file,
            recurrence,
            reset_time,
            reset_poll_interval: Duration::from_secs(poll_secs),
            mail_recipients,
            catalog_file,
            static_dir,
            dapnet,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual helpers.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default`.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Split a comma-separated list, dropping empty entries.
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
