//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Database
//! - `FRESHMART_DATABASE_URL` / `DATABASE_URL` - Full connection URL
//!   (`sqlite://grocery.db` or `postgres://...`). Wins over everything below.
//! - `FRESHMART_DB_BACKEND` - `sqlite` (default) or `postgres`
//! - `FRESHMART_SQLITE_PATH` - Embedded database file (default: grocery.db)
//! - `FRESHMART_DB_HOST` - Networked database host (default: 127.0.0.1)
//! - `FRESHMART_DB_PORT` - Networked database port (default: 5432)
//! - `FRESHMART_DB_USER` - Networked database user (default: postgres)
//! - `FRESHMART_DB_PASSWORD` - Networked database password (default: empty)
//! - `FRESHMART_DB_NAME` - Networked database name (default: `grocery_db`)
//!
//! ## Server
//! - `FRESHMART_HOST` - Bind address (default: 127.0.0.1)
//! - `FRESHMART_PORT` - Listen port (default: 5000)
//! - `FRESHMART_BASE_URL` - Public URL (default: <http://127.0.0.1:5000>)
//! - `FRESHMART_SESSION_SECRET` - Cookie signing secret (min 32 chars, high
//!   entropy). A random key is generated per process when unset.
//! - `FRESHMART_REPORT_TOKEN` - Enables `/report` for callers presenting it
//! - `FRESHMART_LOG_FORMAT` - `pretty` (default) or `json`
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "dev-secret",
    "password",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which relational database backs the store.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// Embedded file-based database.
    Sqlite {
        /// sqlx connection URL, e.g. `sqlite://grocery.db`.
        url: String,
    },
    /// Networked database server.
    Postgres(PostgresConfig),
}

/// Networked database connection settings.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Full URL; when present the individual fields are ignored.
    pub url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
}

impl DatabaseConfig {
    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Pick the backend from a connection URL's scheme.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unsupported schemes.
    pub fn from_url(var: &str, url: String) -> Result<Self, ConfigError> {
        if url.starts_with("sqlite:") {
            return Ok(Self::Sqlite { url });
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Self::Postgres(PostgresConfig {
                url: Some(SecretString::from(url)),
                host: String::new(),
                port: DEFAULT_PG_PORT,
                user: String::new(),
                password: SecretString::from(String::new()),
                database: String::new(),
            }));
        }
        Err(ConfigError::InvalidEnvVar(
            var.to_string(),
            "expected a sqlite: or postgres:// URL".to_string(),
        ))
    }
}

const DEFAULT_PG_PORT: u16 = 5432;

/// Log output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Database backend and connection settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session cookie signing secret
    pub session_secret: Option<SecretString>,
    /// Token that unlocks the table report page
    pub report_token: Option<SecretString>,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or if the session secret
    /// fails validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database = database_config(&env)?;
        let host = env
            .or_default("FRESHMART_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FRESHMART_HOST".to_string(), e.to_string()))?;
        let port = env.parse_or_default("FRESHMART_PORT", 5000)?;
        let base_url = env.or_default("FRESHMART_BASE_URL", "http://127.0.0.1:5000");

        let session_secret = match env.optional("FRESHMART_SESSION_SECRET") {
            Some(value) => {
                let secret = SecretString::from(value);
                validate_session_secret(&secret, "FRESHMART_SESSION_SECRET")?;
                validate_secret_strength(secret.expose_secret(), "FRESHMART_SESSION_SECRET")?;
                Some(secret)
            }
            None => None,
        };

        let report_token = env
            .optional("FRESHMART_REPORT_TOKEN")
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let log_format = match env.or_default("FRESHMART_LOG_FORMAT", "pretty").as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "FRESHMART_LOG_FORMAT".to_string(),
                    format!("expected pretty or json, got {other}"),
                ));
            }
        };

        Ok(Self {
            database,
            host,
            port,
            base_url,
            session_secret,
            report_token,
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Resolve the database settings: explicit URL first, then per-backend parts.
fn database_config<F>(env: &Env<F>) -> Result<DatabaseConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for key in ["FRESHMART_DATABASE_URL", "DATABASE_URL"] {
        if let Some(url) = env.optional(key) {
            return DatabaseConfig::from_url(key, url);
        }
    }

    match env.or_default("FRESHMART_DB_BACKEND", "sqlite").as_str() {
        "sqlite" => {
            let path = env.or_default("FRESHMART_SQLITE_PATH", "grocery.db");
            Ok(DatabaseConfig::Sqlite {
                url: format!("sqlite://{path}"),
            })
        }
        "postgres" => Ok(DatabaseConfig::Postgres(PostgresConfig {
            url: None,
            host: env.or_default("FRESHMART_DB_HOST", "127.0.0.1"),
            port: env.parse_or_default("FRESHMART_DB_PORT", DEFAULT_PG_PORT)?,
            user: env.or_default("FRESHMART_DB_USER", "postgres"),
            password: SecretString::from(env.or_default("FRESHMART_DB_PASSWORD", "")),
            database: env.or_default("FRESHMART_DB_NAME", "grocery_db"),
        })),
        other => Err(ConfigError::InvalidEnvVar(
            "FRESHMART_DB_BACKEND".to_string(),
            format!("expected sqlite or postgres, got {other}"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
