//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub jwt_secret: String,
    pub token_lifetime_hours: i64,
    pub upi_payee_address: String,
    pub upi_payee_name: String,
    pub cors_allowed_origin: String,
    /// Record the first `X-Forwarded-For` hop as the client address. Only for
    /// deployments behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:4000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let database_max_connections = parse_var(
            "DATABASE_MAX_CONNECTIONS",
            &var_or("DATABASE_MAX_CONNECTIONS", "5"),
        )?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Authentication ---
        let jwt_secret = required("JWT_SECRET")?;
        let token_lifetime_hours: i64 =
            parse_var("TOKEN_LIFETIME_HOURS", &var_or("TOKEN_LIFETIME_HOURS", "24"))?;
        if token_lifetime_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_LIFETIME_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Payments and CORS ---
        let upi_payee_address = required("UPI_PAYEE_ADDRESS")?;
        let upi_payee_name = var_or("UPI_PAYEE_NAME", "Landlord");
        let cors_allowed_origin = var_or("CORS_ALLOWED_ORIGIN", "http://localhost:4000");
        let trust_forwarded_for =
            parse_var("TRUST_FORWARDED_FOR", &var_or("TRUST_FORWARDED_FOR", "false"))?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            jwt_secret,
            token_lifetime_hours,
            upi_payee_address,
            upi_payee_name,
            cors_allowed_origin,
            trust_forwarded_for,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[("JWT_SECRET", "s3cret"), ("UPI_PAYEE_ADDRESS", "rent@upi")];

    #[test]
    fn defaults_apply() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.bind_address.port(), 4000);
        assert_eq!(config.token_lifetime_hours, 24);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.database_url.is_none());
        assert_eq!(config.upi_payee_name, "Landlord");
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn forwarded_for_trust_is_opt_in() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("TRUST_FORWARDED_FOR", "true"));
        assert!(load(&pairs).unwrap().trust_forwarded_for);

        let mut pairs = MINIMAL.to_vec();
        pairs.push(("TRUST_FORWARDED_FOR", "sometimes"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = load(&[("UPI_PAYEE_ADDRESS", "rent@upi")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(key) if key == "JWT_SECRET"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("TOKEN_LIFETIME_HOURS", "soon"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));

        let mut pairs = MINIMAL.to_vec();
        pairs.push(("BIND_ADDRESS", "nowhere"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));
    }
}
