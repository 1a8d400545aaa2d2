use crate::gate::{FlowRule, ResourceKey, RuleError};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    #[serde(default = "default_rules")]
    pub rules: Vec<FlowRule>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HarnessConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,
    #[serde(default = "default_resource")]
    pub resource: ResourceKey,
    #[serde(default = "default_max_pause_ms")]
    pub max_pause_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ShutdownConfig {
    /// How long to wait for workers after the stop signal. Zero abandons
    /// them to process exit.
    #[serde(default)]
    pub join_timeout_ms: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("worker_count must be at least 1")]
    NoWorkers,

    #[error("tick_ms must be at least 1")]
    ZeroTick,

    #[error("max_pause_ms must be at least 1")]
    ZeroPause,

    #[error("resource must not be empty")]
    EmptyResource,

    #[error("Invalid flow rule: {0}")]
    Rule(#[from] RuleError),
}

fn default_worker_count() -> usize {
    1000
}

fn default_duration_seconds() -> u64 {
    100
}

fn default_resource() -> ResourceKey {
    ResourceKey::from("abc")
}

fn default_max_pause_ms() -> u64 {
    50
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_rules() -> Vec<FlowRule> {
    vec![FlowRule::qps("abc", 500.0)]
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            duration_seconds: default_duration_seconds(),
            resource: default_resource(),
            max_pause_ms: default_max_pause_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            shutdown: ShutdownConfig::default(),
            rules: default_rules(),
        }
    }
}

impl HarnessConfig {
    pub fn max_pause(&self) -> Duration {
        Duration::from_millis(self.max_pause_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl ShutdownConfig {
    pub fn join_timeout(&self) -> Option<Duration> {
        (self.join_timeout_ms > 0).then(|| Duration::from_millis(self.join_timeout_ms))
    }
}

impl Config {
    pub const DEFAULT_PATH: &str = "config.toml";

    /// Loads `path` when the file exists, otherwise falls back to the
    /// built-in defaults.
    pub fn from_file_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let harness = &self.harness;
        if harness.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if harness.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if harness.max_pause_ms == 0 {
            return Err(ConfigError::ZeroPause);
        }
        if harness.resource.as_str().is_empty() {
            return Err(ConfigError::EmptyResource);
        }
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Grade;

    #[test]
    fn test_empty_file_uses_demo_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.harness.worker_count, 1000);
        assert_eq!(config.harness.duration_seconds, 100);
        assert_eq!(config.harness.max_pause(), Duration::from_millis(50));
        assert_eq!(config.harness.tick(), Duration::from_secs(1));
        assert_eq!(config.rules, vec![FlowRule::qps("abc", 500.0)]);
        assert!(config.shutdown.join_timeout().is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = toml::from_str(
            r#"
            [harness]
            worker_count = 32
            duration_seconds = 10
            resource = "orders"

            [shutdown]
            join_timeout_ms = 250

            [[rules]]
            resource = "orders"
            grade = "thread"
            count = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.harness.worker_count, 32);
        assert_eq!(config.harness.duration_seconds, 10);
        assert_eq!(config.harness.resource, ResourceKey::from("orders"));
        assert_eq!(config.harness.max_pause_ms, 50);
        assert_eq!(
            config.shutdown.join_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].grade, Grade::Thread);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_empty_rules_are_kept() {
        let config: Config = toml::from_str("rules = []").unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_validate_rejects_degenerate_harness() {
        let mut config = Config::default();
        config.harness.worker_count = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

        let mut config = Config::default();
        config.harness.tick_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTick));

        let mut config = Config::default();
        config.harness.max_pause_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPause));

        let mut config = Config::default();
        config.harness.resource = ResourceKey::from("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyResource));
    }

    #[test]
    fn test_validate_allows_zero_duration() {
        let mut config = Config::default();
        config.harness.duration_seconds = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_surfaces_rule_errors() {
        let mut config = Config::default();
        config.rules.push(FlowRule::qps("abc", -1.0));
        assert!(matches!(config.validate(), Err(ConfigError::Rule(_))));
    }

    #[test]
    fn test_from_file_or_default_falls_back_when_absent() {
        let config = Config::from_file_or_default("/nonexistent/flowqps.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_file_or_default_reads_existing_file() {
        let file = format!("flowqps-present-{}.toml", std::process::id());
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, "[harness]\nworker_count = 7\n").unwrap();

        let config = Config::from_file_or_default(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.harness.worker_count, 7);
    }

    #[test]
    fn test_from_file_or_default_rejects_invalid_file() {
        let file = format!("flowqps-invalid-{}.toml", std::process::id());
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, "[harness]\nworker_count = 0\n").unwrap();

        let result = Config::from_file_or_default(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        assert!(Config::from_file("/nonexistent/flowqps.toml").is_err());
    }
}
