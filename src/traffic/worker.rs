use crate::gate::{AdmissionGate, Decision, Permit, ResourceKey};
use crate::stats::{Counters, StopSignal};
use rand::Rng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Admitted,
    Rejected,
    Faulted,
}

/// One simulated client hammering the gate until the stop signal is raised.
pub struct Worker<G: AdmissionGate + ?Sized> {
    id: usize,
    gate: Arc<G>,
    resource: ResourceKey,
    counters: Arc<Counters>,
    stop: StopSignal,
    max_pause: Duration,
}

impl<G: AdmissionGate + ?Sized> Worker<G> {
    pub fn new(
        id: usize,
        gate: Arc<G>,
        resource: ResourceKey,
        counters: Arc<Counters>,
        stop: StopSignal,
        max_pause: Duration,
    ) -> Self {
        Self {
            id,
            gate,
            resource,
            counters,
            stop,
            max_pause,
        }
    }

    pub async fn run(self) {
        debug!("Worker {} started on {}", self.id, self.resource);

        while !self.stop.is_raised() {
            self.attempt();
            tokio::time::sleep(random_pause(self.max_pause)).await;
        }

        debug!("Worker {} observed stop", self.id);
    }

    /// A single request: ask the gate, classify, and count the attempt.
    /// A panicking gate is treated like a gate error and still counts.
    pub fn attempt(&self) -> Outcome {
        let decision = panic::catch_unwind(AssertUnwindSafe(|| {
            self.gate.try_admit(&self.resource)
        }));

        let outcome = match decision {
            Ok(Ok(Decision::Admitted(permit))) => {
                self.counters.record_admitted();
                if let Some(permit) = permit {
                    self.release(permit);
                }
                Outcome::Admitted
            }
            Ok(Ok(Decision::Rejected)) => {
                self.counters.record_rejected();
                Outcome::Rejected
            }
            Ok(Err(e)) => {
                debug!("Worker {} swallowed gate error: {}", self.id, e);
                Outcome::Faulted
            }
            Err(_) => {
                warn!("Worker {} caught a panic from the gate", self.id);
                Outcome::Faulted
            }
        };

        self.counters.record_attempt();
        outcome
    }

    fn release(&self, permit: Permit) {
        match panic::catch_unwind(AssertUnwindSafe(|| self.gate.release(permit))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Worker {} failed to release permit: {}", self.id, e),
            Err(_) => warn!("Worker {} caught a panic releasing its permit", self.id),
        }
    }
}

/// Uniform in `[0, max)`.
fn random_pause(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}
