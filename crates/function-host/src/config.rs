//! Function host configuration.
//!
//! Configuration is loaded from environment variables. When running as an
//! Azure Functions custom handler the host supplies
//! `FUNCTIONS_CUSTOMHANDLER_PORT`; standalone runs use `BIND_ADDRESS`.

use crate::auth::authorizer::{DEFAULT_AUDIENCE, DEFAULT_TRUSTED_ISSUER_PREFIXES};
use crate::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, DEFAULT_JWKS_URL};
use crate::auth::AuthorizerSettings;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default bind address for standalone runs.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Longest allowed JWKS fetch timeout.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// `AZURE_FUNCTIONS_ENVIRONMENT` value that turns on development mode.
pub const DEVELOPMENT_ENVIRONMENT: &str = "Development";

/// Function host configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected token audience (`AZURE_CLIENT_ID`).
    pub audience: String,

    /// Identity platform JWKS endpoint.
    pub jwks_url: String,

    pub trusted_issuer_prefixes: Vec<String>,

    pub jwks_cache_ttl: Duration,

    pub jwks_fetch_timeout: Duration,

    /// Clock skew tolerance for `iat`.
    pub jwt_clock_skew: Duration,

    /// Raw `AZURE_FUNCTIONS_ENVIRONMENT`, if set.
    pub environment: Option<String>,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("audience", &"[REDACTED]")
            .field("jwks_url", &self.jwks_url)
            .field("trusted_issuer_prefixes", &self.trusted_issuer_prefixes)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("environment", &self.environment)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuers(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match (vars.get("BIND_ADDRESS"), vars.get("FUNCTIONS_CUSTOMHANDLER_PORT")) {
            (Some(address), _) => address.clone(),
            (None, Some(port_str)) => {
                let port: u16 = port_str.parse().map_err(|e| {
                    ConfigError::InvalidPort(format!(
                        "FUNCTIONS_CUSTOMHANDLER_PORT must be a valid port, got '{}': {}",
                        port_str, e
                    ))
                })?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND_ADDRESS.to_string(),
        };

        let audience = vars
            .get("AZURE_CLIENT_ID")
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

        let trusted_issuer_prefixes = if let Some(value_str) = vars.get("TRUSTED_ISSUER_PREFIXES") {
            let prefixes: Vec<String> = value_str
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string)
                .collect();

            if prefixes.is_empty() {
                return Err(ConfigError::InvalidIssuers(
                    "TRUSTED_ISSUER_PREFIXES must list at least one issuer prefix".to_string(),
                ));
            }

            if let Some(bad) = prefixes.iter().find(|p| !p.starts_with("https://")) {
                return Err(ConfigError::InvalidIssuers(format!(
                    "TRUSTED_ISSUER_PREFIXES entries must be https URLs, got '{}'",
                    bad
                )));
            }

            prefixes
        } else {
            DEFAULT_TRUSTED_ISSUER_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect()
        };

        // Parse JWKS cache TTL with validation
        let jwks_cache_ttl = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidCacheTtl(
                    "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CACHE_TTL
        };

        // Parse JWKS fetch timeout with validation
        let jwks_fetch_timeout = if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_FETCH_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_FETCH_TIMEOUT_SECONDS, value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_FETCH_TIMEOUT
        };

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let environment = vars
            .get("AZURE_FUNCTIONS_ENVIRONMENT")
            .filter(|value| !value.is_empty())
            .cloned();

        let drain_seconds = if let Some(value_str) = vars.get("DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            bind_address,
            audience,
            jwks_url,
            trusted_issuer_prefixes,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            jwt_clock_skew,
            environment,
            drain_seconds,
        })
    }

    /// Development mode skips authentication on the test routes.
    pub fn is_development(&self) -> bool {
        self.environment.as_deref() == Some(DEVELOPMENT_ENVIRONMENT)
    }

    /// Environment name as reported by the health endpoint.
    pub fn environment_name(&self) -> &str {
        self.environment.as_deref().unwrap_or("production")
    }

    /// Claim policy for the token authorizer.
    pub fn authorizer_settings(&self) -> AuthorizerSettings {
        AuthorizerSettings {
            audience: self.audience.clone(),
            trusted_issuer_prefixes: self.trusted_issuer_prefixes.clone(),
            clock_skew: self.jwt_clock_skew,
        }
    }
}
