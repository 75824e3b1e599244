//! Configuration for the administration core
//!
//! Type-safe configuration with serde support, loaded from an optional
//! project-level YAML file merged over defaults.

use crate::core::error::AdminError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".org-admin.yaml";

/// Deployments with a key phase beyond this value require organization key
/// activation before impersonation is allowed
pub const KEY_PHASE_IMPERSONATION_CUTOFF: u32 = 3;

/// Root configuration object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    /// Session handoff tuning
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Security policy knobs
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Session handoff tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandoffConfig {
    /// Fixed interval between delivery attempts while awaiting `ready`
    #[serde(default = "default_retry_interval_ms", rename = "retryIntervalMs")]
    pub retry_interval_ms: u64,

    /// Total wait bound before the handoff times out
    #[serde(default = "default_max_wait_ms", rename = "maxWaitMs")]
    pub max_wait_ms: u64,
}

impl HandoffConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

fn default_retry_interval_ms() -> u64 {
    500
}

fn default_max_wait_ms() -> u64 {
    30_000
}

/// Security policy knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    /// Key phase of the deployment; phases beyond
    /// [`KEY_PHASE_IMPERSONATION_CUTOFF`] block impersonation while the
    /// organization key is not activated
    #[serde(default = "default_key_phase", rename = "keyPhase")]
    pub key_phase: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            key_phase: default_key_phase(),
        }
    }
}

fn default_key_phase() -> u32 {
    4
}

impl AdminConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, AdminError> {
        serde_yaml::from_str(content).map_err(|e| AdminError::Config(e.to_string()))
    }

    /// Load `.org-admin.yaml` from the project directory
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub async fn load<P: AsRef<Path>>(project_path: P) -> Result<Self, AdminError> {
        let path = project_path.as_ref().join(CONFIG_FILENAME);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AdminError::Config(e.to_string()))?;

        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();

        assert_eq!(config.handoff.retry_interval(), Duration::from_millis(500));
        assert_eq!(config.handoff.max_wait(), Duration::from_secs(30));
        assert_eq!(config.security.key_phase, 4);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AdminConfig::from_yaml("handoff:\n  maxWaitMs: 5000\n").unwrap();

        assert_eq!(config.handoff.max_wait_ms, 5000);
        assert_eq!(config.handoff.retry_interval_ms, 500);
        assert_eq!(config.security.key_phase, 4);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
handoff:
  retryIntervalMs: 250
  maxWaitMs: 10000
security:
  keyPhase: 2
"#;
        let config = AdminConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.handoff.retry_interval_ms, 250);
        assert_eq!(config.handoff.max_wait_ms, 10_000);
        assert_eq!(config.security.key_phase, 2);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let result = AdminConfig::from_yaml("handoff: [not, a, map]");

        assert!(matches!(result, Err(AdminError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_defaults() {
        let config = AdminConfig::load("/definitely/not/a/project/dir")
            .await
            .unwrap();

        assert_eq!(config, AdminConfig::default());
    }
}
