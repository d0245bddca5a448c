//! Storefront configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://staging-nextshop-backend.prospectbdltd.com/api";
pub const DEFAULT_TENANT_ID: &str = "nextshop";
pub const DEFAULT_STATE_DIR_NAME: &str = ".storefront";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),

    /// No state directory was given and no home directory could be resolved.
    #[error("could not resolve a home directory for session storage")]
    NoHomeDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Origin plus path prefix, without a trailing slash.
    pub api_base_url: String,
    /// Sent as `X-Tenant` on every request.
    pub tenant_id: String,
    /// Directory holding `storage.json`.
    pub state_dir: PathBuf,
    pub timeouts: Timeouts,
}

impl StorefrontConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `STOREFRONT_API_BASE_URL`: defaults to the staging backend
    /// - `STOREFRONT_TENANT_ID`: default `nextshop`
    /// - `STOREFRONT_STATE_DIR`: default `~/.storefront`
    /// - `STOREFRONT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `STOREFRONT_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s), the tenant is blank,
    /// or no state directory can be resolved.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(
            &std::env::var("STOREFRONT_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        )?;

        let tenant_id = std::env::var("STOREFRONT_TENANT_ID").unwrap_or_else(|_| DEFAULT_TENANT_ID.to_string());
        if tenant_id.trim().is_empty() {
            return Err(ConfigError::Parse("STOREFRONT_TENANT_ID must not be empty".into()));
        }

        let state_dir = match std::env::var("STOREFRONT_STATE_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_state_dir()?,
        };

        let timeouts = Timeouts {
            request_secs: env_parse_u64("STOREFRONT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("STOREFRONT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base_url, tenant_id, state_dir, timeouts })
    }

    /// Path of the JSON document backing durable session storage.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.state_dir.join("storage.json")
    }
}

/// Trim a trailing slash and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for any other scheme.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Parse(format!("invalid API base URL: {raw}")));
    }
    Ok(trimmed.to_string())
}

fn default_state_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(DEFAULT_STATE_DIR_NAME))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
