#![allow(dead_code)]

use flowqps::aggregator::{Aggregator, IntervalReport, Report, RunSummary};
use flowqps::gate::{AdmissionGate, Decision, GateError, Permit, ResourceKey};
use flowqps::stats::{Counters, StopSignal};
use flowqps::traffic::{WorkerHandles, WorkerPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub const MAX_PAUSE: Duration = Duration::from_millis(50);
pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub enum Script {
    AlwaysAdmit,
    AlwaysReject,
    Alternate,
    Fault,
    AdmitButFailRelease,
    PanicOnFirstCall,
}

pub struct ScriptedGate {
    script: Script,
    calls: AtomicU64,
    releases: AtomicU64,
}

impl ScriptedGate {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

impl AdmissionGate for ScriptedGate {
    fn try_admit(&self, resource: &ResourceKey) -> Result<Decision, GateError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let admitted = Decision::Admitted(Some(Permit::new(resource.clone())));
        match self.script {
            Script::PanicOnFirstCall if call == 0 => panic!("scripted panic"),
            Script::AlwaysAdmit | Script::AdmitButFailRelease | Script::PanicOnFirstCall => {
                Ok(admitted)
            }
            Script::AlwaysReject => Ok(Decision::Rejected),
            Script::Alternate if call % 2 == 0 => Ok(admitted),
            Script::Alternate => Ok(Decision::Rejected),
            Script::Fault => Err(GateError::Fault {
                resource: resource.clone(),
                reason: "scripted fault".to_string(),
            }),
        }
    }

    fn release(&self, permit: Permit) -> Result<(), GateError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::AdmitButFailRelease => Err(GateError::Release {
                resource: permit.resource().clone(),
                reason: "scripted release failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub struct Run {
    pub summary: RunSummary,
    pub intervals: Vec<IntervalReport>,
    pub counters: Arc<Counters>,
    pub stop: StopSignal,
    pub workers: WorkerHandles,
}

/// Launches `worker_count` workers against `gate` and drives the aggregator
/// to completion with a budget of `budget` ticks.
pub async fn run_harness<G: AdmissionGate + ?Sized>(
    gate: Arc<G>,
    worker_count: usize,
    budget: u64,
) -> Run {
    let counters = Arc::new(Counters::new());
    let stop = StopSignal::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let aggregator = Aggregator::new(counters.clone(), stop.clone(), budget, TICK, tx);
    let pool = WorkerPool::new(gate, counters.clone(), MAX_PAUSE);
    let workers = pool.launch(worker_count, &ResourceKey::from("abc"), &stop);

    let summary = aggregator.run().await;

    let mut intervals = Vec::new();
    while let Ok(report) = rx.try_recv() {
        if let Report::Interval(interval) = report {
            intervals.push(interval);
        }
    }

    Run {
        summary,
        intervals,
        counters,
        stop,
        workers,
    }
}
