//! Config - Process-wide provider settings
//!
//! Settings are resolved once at provider start-up and passed explicitly into
//! every operation; nothing here is mutated afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::{ErrorKind, ProviderError, ProviderResult};

pub const ENV_READ_RETRY_TIMEOUT: &str = "CIRRUS_READ_RETRY_TIMEOUT";
pub const ENV_WRITE_RETRY_TIMEOUT: &str = "CIRRUS_WRITE_RETRY_TIMEOUT";
pub const ENV_RATE_LIMIT_CONFIG: &str = "CIRRUS_RATE_LIMIT_CONFIG";

/// Time budgets for apply loops (write) and poll loops (read)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// First backoff delay
    pub min_interval: Duration,
    /// Backoff ceiling
    pub max_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(3 * 60),
            write_timeout: Duration::from_secs(5 * 60),
            min_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
        }
    }
}

/// Per-action call budgets (calls per second)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "RateLimitConfig::default_limit")]
    pub default_limit: u32,
    #[serde(default)]
    pub actions: HashMap<String, u32>,
}

impl RateLimitConfig {
    pub const DEFAULT_LIMIT: u32 = 20;

    fn default_limit() -> u32 {
        Self::DEFAULT_LIMIT
    }

    /// Budget for `action`, falling back to the default
    pub fn limit_for(&self, action: &str) -> u32 {
        self.actions
            .get(action)
            .copied()
            .unwrap_or(self.default_limit)
            .max(1)
    }

    pub fn with_limit(mut self, action: impl Into<String>, limit: u32) -> Self {
        self.actions.insert(action.into(), limit);
        self
    }

    /// Load from a JSON file such as `{"default_limit": 10, "actions": {"CreateTask": 2}}`
    pub fn from_file(path: &Path) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::new(
                ErrorKind::Io,
                format!("Failed to read rate limit config {}: {}", path.display(), e),
            )
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ProviderError::validation(format!(
                "Invalid rate limit config {}: {}",
                path.display(),
                e
            ))
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::DEFAULT_LIMIT,
            actions: HashMap::new(),
        }
    }
}

/// Complete provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
}

impl ProviderConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_secs(&lookup, ENV_READ_RETRY_TIMEOUT)? {
            config.retry.read_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, ENV_WRITE_RETRY_TIMEOUT)? {
            config.retry.write_timeout = secs;
        }
        if let Some(path) = lookup(ENV_RATE_LIMIT_CONFIG).filter(|p| !p.is_empty()) {
            config.rate_limit = RateLimitConfig::from_file(Path::new(&path))?;
        }

        log::debug!(
            "provider config: read timeout {:?}, write timeout {:?}, default rate limit {}/s",
            config.retry.read_timeout,
            config.retry.write_timeout,
            config.rate_limit.default_limit
        );
        Ok(config)
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> ProviderResult<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| {
                ProviderError::validation(format!(
                    "{} must be a number of seconds, got '{}'",
                    key, raw
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_environment() {
        let config = ProviderConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.retry.read_timeout, Duration::from_secs(180));
        assert_eq!(config.retry.write_timeout, Duration::from_secs(300));
        assert_eq!(config.rate_limit.limit_for("CreateTask"), 20);
    }

    #[test]
    fn timeouts_from_lookup() {
        let config = ProviderConfig::from_lookup(|key| match key {
            ENV_READ_RETRY_TIMEOUT => Some("30".to_string()),
            ENV_WRITE_RETRY_TIMEOUT => Some(" 60 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.retry.read_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.write_timeout, Duration::from_secs(60));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = ProviderConfig::from_lookup(|key| {
            (key == ENV_WRITE_RETRY_TIMEOUT).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn rate_limits_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"default_limit": 10, "actions": {{"CreateTask": 2}}}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ProviderConfig::from_lookup(|key| {
            (key == ENV_RATE_LIMIT_CONFIG).then(|| path.clone())
        })
        .unwrap();

        assert_eq!(config.rate_limit.limit_for("CreateTask"), 2);
        assert_eq!(config.rate_limit.limit_for("DescribeTaskDetail"), 10);
    }
}
