use super::ResourceKey;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Passed requests per one-second window.
    #[default]
    Qps,
    /// Permits held at the same time.
    Thread,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowRule {
    pub resource: ResourceKey,
    #[serde(default)]
    pub grade: Grade,
    pub count: f64,
    #[serde(default = "default_limit_app")]
    pub limit_app: String,
}

fn default_limit_app() -> String {
    "default".to_string()
}

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("Flow rule has an empty resource name")]
    EmptyResource,

    #[error("Flow rule for {resource} has invalid count {count}")]
    InvalidCount { resource: ResourceKey, count: f64 },
}

impl FlowRule {
    pub fn qps(resource: impl Into<String>, count: f64) -> Self {
        Self {
            resource: ResourceKey::new(resource),
            grade: Grade::Qps,
            count,
            limit_app: default_limit_app(),
        }
    }

    pub fn thread(resource: impl Into<String>, count: f64) -> Self {
        Self {
            grade: Grade::Thread,
            ..Self::qps(resource, count)
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.resource.as_str().is_empty() {
            return Err(RuleError::EmptyResource);
        }
        if !self.count.is_finite() || self.count < 0.0 {
            return Err(RuleError::InvalidCount {
                resource: self.resource.clone(),
                count: self.count,
            });
        }
        Ok(())
    }

    /// Whether one more request fits on top of `current`.
    pub(super) fn allows(&self, current: u64) -> bool {
        (current + 1) as f64 <= self.count
    }
}
