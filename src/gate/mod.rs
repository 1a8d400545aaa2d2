//! Admission gate seam. Workers only see a pass/reject decision; what
//! stands behind the trait is opaque to the harness.

mod flow;
mod rule;

pub use flow::FlowGate;
pub use rule::{FlowRule, Grade, RuleError};

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(pub String);

impl ResourceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Token handed out on admission. Must be given back through
/// [`AdmissionGate::release`]; dropping it does not release anything.
#[derive(Debug)]
pub struct Permit {
    pub(crate) resource: ResourceKey,
    pub(crate) slot: Option<Arc<AtomicU64>>,
}

impl Permit {
    pub fn new(resource: ResourceKey) -> Self {
        Self {
            resource,
            slot: None,
        }
    }

    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }
}

#[derive(Debug)]
pub enum Decision {
    Admitted(Option<Permit>),
    Rejected,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Gate fault on {resource}: {reason}")]
    Fault { resource: ResourceKey, reason: String },

    #[error("Failed to release permit for {resource}: {reason}")]
    Release { resource: ResourceKey, reason: String },
}

pub trait AdmissionGate: Send + Sync + 'static {
    fn try_admit(&self, resource: &ResourceKey) -> Result<Decision, GateError>;

    fn release(&self, permit: Permit) -> Result<(), GateError>;
}
