//! CAS client configuration.
//!
//! Configuration is loaded from environment variables. Only the server URL
//! prefix is required; everything else has a default.

use crate::validation::{Protocol, ProxyPolicy};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default PGT correlation lifetime in seconds.
pub const DEFAULT_PGT_TTL_SECONDS: u64 = 60;

/// Default interval between PGT storage sweeps in seconds.
pub const DEFAULT_PGT_CLEANUP_INTERVAL_SECONDS: u64 = 30;

/// Default HTTP timeout for validation and proxy requests in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// CAS client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasClientConfig {
    /// CAS server URL prefix, e.g. `https://cas.example.org/cas`.
    pub server_url_prefix: String,

    /// Protocol version (default: CAS 2.0).
    pub protocol: Protocol,

    /// Send `renew=true` with every validation request.
    pub renew: bool,

    /// `pgtUrl` sent to the server, if proxying is wanted.
    pub proxy_callback_url: Option<String>,

    /// Validate at the proxy endpoint and accept proxy tickets.
    pub accept_proxy_tickets: bool,

    /// Accept proxy tickets from any chain.
    pub accept_any_proxy: bool,

    /// Proxy chains accepted when `accept_any_proxy` is off.
    pub allowed_proxy_chains: Vec<Vec<String>>,

    /// How long a PGT-IOU correlation is kept (default: 60).
    pub pgt_ttl_seconds: u64,

    /// Interval between PGT storage sweeps (default: 30).
    /// Must be shorter than the TTL.
    pub pgt_cleanup_interval_seconds: u64,

    /// HTTP timeout towards the CAS server (default: 10).
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid CAS server URL: {0}")]
    InvalidServerUrl(String),

    #[error("Invalid CAS protocol: {0}")]
    InvalidProtocol(String),

    #[error("Invalid boolean setting: {0}")]
    InvalidFlag(String),

    #[error("Invalid PGT TTL configuration: {0}")]
    InvalidPgtTtl(String),

    #[error("Invalid PGT cleanup interval configuration: {0}")]
    InvalidCleanupInterval(String),

    #[error("Invalid HTTP timeout configuration: {0}")]
    InvalidHttpTimeout(String),
}

impl CasClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let server_url_prefix = vars
            .get("CAS_SERVER_URL_PREFIX")
            .ok_or_else(|| ConfigError::MissingEnvVar("CAS_SERVER_URL_PREFIX".to_string()))?
            .clone();
        parse_server_url(&server_url_prefix)?;

        let protocol = match vars.get("CAS_PROTOCOL") {
            Some(value) => value.parse().map_err(ConfigError::InvalidProtocol)?,
            None => Protocol::default(),
        };

        let renew = parse_flag(vars, "CAS_RENEW")?;
        let accept_proxy_tickets = parse_flag(vars, "CAS_ACCEPT_PROXY_TICKETS")?;
        let accept_any_proxy = parse_flag(vars, "CAS_ACCEPT_ANY_PROXY")?;

        let proxy_callback_url = vars
            .get("CAS_PROXY_CALLBACK_URL")
            .filter(|value| !value.trim().is_empty())
            .cloned();

        let allowed_proxy_chains = vars
            .get("CAS_ALLOWED_PROXY_CHAINS")
            .map(|value| ProxyPolicy::parse_chains(value))
            .unwrap_or_default();

        let pgt_ttl_seconds = parse_seconds(
            vars,
            "CAS_PGT_TTL_SECONDS",
            DEFAULT_PGT_TTL_SECONDS,
            ConfigError::InvalidPgtTtl,
        )?;

        let pgt_cleanup_interval_seconds = parse_seconds(
            vars,
            "CAS_PGT_CLEANUP_INTERVAL_SECONDS",
            DEFAULT_PGT_CLEANUP_INTERVAL_SECONDS,
            ConfigError::InvalidCleanupInterval,
        )?;

        // A sweep slower than the TTL would let expired correlations pile up
        if pgt_cleanup_interval_seconds >= pgt_ttl_seconds {
            return Err(ConfigError::InvalidCleanupInterval(format!(
                "CAS_PGT_CLEANUP_INTERVAL_SECONDS ({pgt_cleanup_interval_seconds}) must be less than CAS_PGT_TTL_SECONDS ({pgt_ttl_seconds})"
            )));
        }

        let http_timeout_seconds = parse_seconds(
            vars,
            "CAS_HTTP_TIMEOUT_SECONDS",
            DEFAULT_HTTP_TIMEOUT_SECONDS,
            ConfigError::InvalidHttpTimeout,
        )?;

        Ok(CasClientConfig {
            server_url_prefix,
            protocol,
            renew,
            proxy_callback_url,
            accept_proxy_tickets,
            accept_any_proxy,
            allowed_proxy_chains,
            pgt_ttl_seconds,
            pgt_cleanup_interval_seconds,
            http_timeout_seconds,
        })
    }

    /// Proxy policy to validate with, or `None` for service tickets only.
    #[must_use]
    pub fn proxy_policy(&self) -> Option<ProxyPolicy> {
        if !self.accept_proxy_tickets {
            return None;
        }

        if self.accept_any_proxy {
            Some(ProxyPolicy::accept_any())
        } else {
            Some(ProxyPolicy::allowed_chains(self.allowed_proxy_chains.clone()))
        }
    }

    #[must_use]
    pub fn pgt_ttl(&self) -> Duration {
        Duration::from_secs(self.pgt_ttl_seconds)
    }

    #[must_use]
    pub fn pgt_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.pgt_cleanup_interval_seconds)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

/// Parse and check a CAS server URL prefix.
pub(crate) fn parse_server_url(prefix: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(prefix)
        .map_err(|e| ConfigError::InvalidServerUrl(format!("'{prefix}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidServerUrl(format!(
            "'{prefix}' must be an http or https URL"
        )));
    }

    Ok(url)
}

fn parse_flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    let Some(value) = vars.get(name) else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(format!(
            "{name} must be true or false, got '{value}'"
        ))),
    }
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    error: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        error(format!(
            "{name} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(error(format!("{name} must be greater than 0")));
    }

    Ok(value)
}
