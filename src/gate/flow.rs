use super::rule::{FlowRule, Grade, RuleError};
use super::{AdmissionGate, Decision, GateError, Permit, ResourceKey};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::{debug, info};

const WINDOW_MS: u64 = 1000;

#[derive(Debug)]
struct ResourceState {
    rule: FlowRule,
    window_start_ms: AtomicU64,
    window_passed: AtomicU64,
    in_flight: Arc<AtomicU64>,
}

impl ResourceState {
    fn new(rule: FlowRule) -> Self {
        Self {
            rule,
            window_start_ms: AtomicU64::new(0),
            window_passed: AtomicU64::new(0),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_pass_window(&self, now_ms: u64) -> bool {
        let window = now_ms - now_ms % WINDOW_MS;
        let start = self.window_start_ms.load(Ordering::Acquire);

        // Only the caller that wins the roll-over resets the count. Requests
        // racing the reset may land in either window.
        if window > start
            && self
                .window_start_ms
                .compare_exchange(start, window, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.window_passed.store(0, Ordering::Release);
        }

        self.window_passed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |passed| {
                self.rule.allows(passed).then_some(passed + 1)
            })
            .is_ok()
    }

    fn try_take_slot(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                self.rule.allows(held).then_some(held + 1)
            })
            .is_ok()
    }
}

/// In-process gate enforcing flow rules per resource. A resource with no
/// rule is always admitted.
#[derive(Debug)]
pub struct FlowGate {
    resources: DashMap<ResourceKey, Arc<ResourceState>>,
    epoch: Instant,
}

impl Default for FlowGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowGate {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
            epoch: Instant::now(),
        }
    }

    pub fn with_rules(rules: Vec<FlowRule>) -> Result<Self, RuleError> {
        let gate = Self::new();
        gate.load_rules(rules)?;
        Ok(gate)
    }

    /// Replaces the whole rule table. Nothing is changed if any rule fails
    /// validation. When several rules name the same resource the last wins.
    pub fn load_rules(&self, rules: Vec<FlowRule>) -> Result<usize, RuleError> {
        for rule in &rules {
            rule.validate()?;
        }

        self.resources.clear();
        for rule in rules {
            info!(
                "Loaded {:?} rule for {}: count={}, limit_app={}",
                rule.grade, rule.resource, rule.count, rule.limit_app
            );
            self.resources
                .insert(rule.resource.clone(), Arc::new(ResourceState::new(rule)));
        }

        Ok(self.resources.len())
    }

    pub fn rule(&self, resource: &ResourceKey) -> Option<FlowRule> {
        self.resources.get(resource).map(|state| state.rule.clone())
    }

    /// Permits currently held against a thread-grade rule.
    pub fn in_flight(&self, resource: &ResourceKey) -> u64 {
        self.resources
            .get(resource)
            .map(|state| state.in_flight.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl AdmissionGate for FlowGate {
    fn try_admit(&self, resource: &ResourceKey) -> Result<Decision, GateError> {
        let Some(state) = self.resources.get(resource).map(|s| s.value().clone()) else {
            return Ok(Decision::Admitted(Some(Permit::new(resource.clone()))));
        };

        let decision = match state.rule.grade {
            Grade::Qps => {
                if state.try_pass_window(self.now_ms()) {
                    Decision::Admitted(Some(Permit::new(resource.clone())))
                } else {
                    Decision::Rejected
                }
            }
            Grade::Thread => {
                if state.try_take_slot() {
                    Decision::Admitted(Some(Permit {
                        resource: resource.clone(),
                        slot: Some(state.in_flight.clone()),
                    }))
                } else {
                    Decision::Rejected
                }
            }
        };

        Ok(decision)
    }

    fn release(&self, permit: Permit) -> Result<(), GateError> {
        // The permit keeps its own handle on the slot counter, so a rule
        // reload in between still balances the count it was taken from.
        let Some(slot) = permit.slot else {
            return Ok(());
        };

        match slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
            held.checked_sub(1)
        }) {
            Ok(_) => Ok(()),
            Err(_) => {
                debug!("Release on {} found no permit in flight", permit.resource);
                Err(GateError::Release {
                    resource: permit.resource,
                    reason: "no permit in flight".to_string(),
                })
            }
        }
    }
}
