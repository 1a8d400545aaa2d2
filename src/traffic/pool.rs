use super::worker::Worker;
use crate::gate::{AdmissionGate, ResourceKey};
use crate::stats::{Counters, StopSignal};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct WorkerPool<G: AdmissionGate + ?Sized> {
    gate: Arc<G>,
    counters: Arc<Counters>,
    max_pause: Duration,
}

impl<G: AdmissionGate + ?Sized> WorkerPool<G> {
    pub fn new(gate: Arc<G>, counters: Arc<Counters>, max_pause: Duration) -> Self {
        Self {
            gate,
            counters,
            max_pause,
        }
    }

    /// Spawns `worker_count` workers and returns without waiting on them.
    /// They exit on their own once `stop` is raised.
    pub fn launch(
        &self,
        worker_count: usize,
        resource: &ResourceKey,
        stop: &StopSignal,
    ) -> WorkerHandles {
        let handles = (0..worker_count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    self.gate.clone(),
                    resource.clone(),
                    self.counters.clone(),
                    stop.clone(),
                    self.max_pause,
                );
                tokio::spawn(worker.run())
            })
            .collect();

        info!("Launched {} workers on {}", worker_count, resource);
        WorkerHandles { handles }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub finished: usize,
    pub failed: usize,
    pub abandoned: usize,
}

pub struct WorkerHandles {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerHandles {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits up to `timeout` for workers to exit. Stragglers are aborted.
    pub async fn drain(self, timeout: Duration) -> DrainReport {
        let mut pending: FuturesUnordered<_> = self.handles.into_iter().collect();
        let mut report = DrainReport::default();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = pending.next() => match joined {
                    Some(Ok(())) => report.finished += 1,
                    Some(Err(e)) => {
                        error!("Worker task failed: {}", e);
                        report.failed += 1;
                    }
                    None => break,
                },
                _ = &mut deadline => break,
            }
        }

        for handle in pending.iter() {
            handle.abort();
        }
        report.abandoned = pending.len();

        report
    }
}
