/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string, or `memory://` for the in-memory store (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 5000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `APP_ENV`: `production` enables HSTS and hides internal error detail
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `JWT_EXPIRATION_HOURS`: Token lifetime (default: 168)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: Password hashing cost
/// - `LOG_FORMAT`: `json` for structured logs, anything else for human-readable
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use taskly_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};
use taskly_shared::auth::password::HashParams;

/// `DATABASE_URL` value that selects the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Password hashing cost
    pub password: HashParams,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL or `memory://`
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_URL)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Token lifetime in hours
    pub expiration_hours: i64,
}

impl JwtConfig {
    pub fn expiration(&self) -> Duration {
        Duration::hours(self.expiration_hours)
    }
}

/// Reads an optional variable, falling back to `default` when unset
fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = var_or("API_PORT", 5000u16)?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        let expiration_hours = var_or("JWT_EXPIRATION_HOURS", 168i64)?;

        let defaults = HashParams::default();
        let password = HashParams {
            memory_kib: var_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: var_or("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: var_or("ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let config = Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours,
            },
            password,
        };
        config.validate()?;

        Ok(config)
    }

    /// Checks cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        if self.jwt.expiration_hours <= 0 {
            anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                expiration_hours: 168,
            },
            password: HashParams::default(),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_memory_url_detection() {
        let mut config = config();
        assert!(config.database.is_memory());

        config.database.url = "postgresql://localhost/taskly".to_string();
        assert!(!config.database.is_memory());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = config();
        assert!(config.validate().is_ok());

        config.jwt.secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expiration_default_is_a_week() {
        assert_eq!(config().jwt.expiration(), Duration::days(7));
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com,"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
    }

    #[test]
    fn test_secret_not_serialized() {
        let json = serde_json::to_value(config()).unwrap();
        assert!(json["jwt"].get("secret").is_none());
    }
}
