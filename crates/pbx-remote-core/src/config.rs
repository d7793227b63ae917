//! Connection and queue configuration.
//!
//! Loading order:
//! 1. Compiled [`PbxConfig::default()`]
//! 2. Values from a JSON file, deep-merged over the defaults
//! 3. `PBX_REMOTE_*` environment variables (highest priority)

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Settings for one switch connection and its command queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PbxConfig {
    /// Manager HTTP endpoint, e.g. `http://127.0.0.1:8088/mxml`.
    pub endpoint: String,
    /// Manager user name.
    pub username: Option<String>,
    /// Manager secret.
    pub secret: Option<String>,
    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout_ms: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Queue database URL (SQLite backend).
    pub database_url: String,
    /// Seconds after which a claimed but unfinished queue item may be
    /// claimed again.
    pub claim_ttl_secs: u64,
}

impl Default for PbxConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8088/mxml".to_string(),
            username: None,
            secret: None,
            request_timeout_ms: 30_000,
            user_agent: concat!("pbx-remote/", env!("CARGO_PKG_VERSION")).to_string(),
            database_url: "sqlite://pbx-queue.db".to_string(),
            claim_ttl_secs: 300,
        }
    }
}

impl PbxConfig {
    /// Load from defaults plus environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_env_overrides(&mut config);
        config
    }

    /// Load from a JSON file (if it exists) plus environment overrides.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let defaults = serde_json::to_value(Self::default())?;

        let merged = if path.exists() {
            debug!(?path, "loading config from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        } else {
            debug!(?path, "config file not found, using defaults");
            defaults
        };

        let mut config: Self = serde_json::from_value(merged)?;
        apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed in the type.
    ///
    /// # Errors
    /// Returns error if the endpoint is empty or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue("endpoint is empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "requestTimeoutMs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, everything else is replaced by `source`, and
/// `null` in `source` keeps the target value.
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PBX_REMOTE_*` overrides. Unparseable numbers are ignored.
pub fn apply_env_overrides(config: &mut PbxConfig) {
    if let Some(v) = read_env_string("PBX_REMOTE_ENDPOINT") {
        config.endpoint = v;
    }
    if let Some(v) = read_env_string("PBX_REMOTE_USERNAME") {
        config.username = Some(v);
    }
    if let Some(v) = read_env_string("PBX_REMOTE_SECRET") {
        config.secret = Some(v);
    }
    if let Some(v) = read_env_u64("PBX_REMOTE_TIMEOUT_MS") {
        config.request_timeout_ms = v;
    }
    if let Some(v) = read_env_string("PBX_REMOTE_USER_AGENT") {
        config.user_agent = v;
    }
    if let Some(v) = read_env_string("PBX_REMOTE_DATABASE_URL") {
        config.database_url = v;
    }
    if let Some(v) = read_env_u64("PBX_REMOTE_CLAIM_TTL_SECS") {
        config.claim_ttl_secs = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_env_u64(name: &str) -> Option<u64> {
    read_env_string(name).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_deep_merge_skips_null() {
        let merged = deep_merge(
            json!({"endpoint": "a", "username": "admin", "nested": {"x": 1, "y": 2}}),
            json!({"username": null, "nested": {"y": 3}}),
        );
        assert_eq!(
            merged,
            json!({"endpoint": "a", "username": "admin", "nested": {"x": 1, "y": 3}})
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PbxConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.request_timeout_ms, PbxConfig::default().request_timeout_ms);
    }

    #[test]
    fn test_load_merges_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"endpoint": "http://pbx.local:8088/mxml", "username": "manager", "claimTtlSecs": 60}}"#
        )
        .unwrap();

        let config = PbxConfig::load(file.path()).unwrap();
        assert_eq!(config.endpoint, "http://pbx.local:8088/mxml");
        assert_eq!(config.username.as_deref(), Some("manager"));
        assert_eq!(config.claim_ttl_secs, 60);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(PbxConfig::load(file.path()), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let config = PbxConfig {
            endpoint: "  ".to_string(),
            ..PbxConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
