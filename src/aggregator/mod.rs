mod report;

pub use report::{IntervalReport, Report, ReportSink, RunSummary, StdoutSink};

use crate::stats::{Counters, IntervalSample, StopSignal};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Running,
    Stopping,
    Terminated,
}

/// Samples the shared counters once per tick, reports per-interval deltas,
/// and ends the run when the budget of ticks is spent.
pub struct Aggregator<S: ReportSink> {
    counters: Arc<Counters>,
    stop: StopSignal,
    tick: Duration,
    remaining: u64,
    previous: IntervalSample,
    state: AggregatorState,
    started: Instant,
    sink: S,
}

impl<S: ReportSink> Aggregator<S> {
    pub fn new(
        counters: Arc<Counters>,
        stop: StopSignal,
        budget: u64,
        tick: Duration,
        sink: S,
    ) -> Self {
        Self {
            counters,
            stop,
            tick,
            remaining: budget,
            previous: IntervalSample::default(),
            state: AggregatorState::Running,
            started: Instant::now(),
            sink,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub async fn run(mut self) -> RunSummary {
        info!(
            "Aggregator started: budget={} ticks, tick={:?}",
            self.remaining, self.tick
        );
        self.started = Instant::now();

        // interval_at skips the immediate first tick that time::interval yields
        let mut interval = time::interval_at(self.started + self.tick, self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state == AggregatorState::Running {
            interval.tick().await;
            self.sample_tick();
        }

        self.finish()
    }

    /// One Running step: sample, report the delta, spend one tick of budget.
    pub fn sample_tick(&mut self) -> IntervalReport {
        let sample = self.counters.snapshot();
        let report = IntervalReport {
            remaining: self.remaining,
            delta: sample.delta_since(&self.previous),
            timestamp_ms: wall_clock_ms(),
        };
        self.previous = sample;
        self.sink.emit(&Report::Interval(report));

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 && self.state == AggregatorState::Running {
            debug!("Run budget exhausted");
            self.state = AggregatorState::Stopping;
        }

        report
    }

    /// Stopping then Terminated: raise the stop signal and report totals.
    pub fn finish(&mut self) -> RunSummary {
        self.state = AggregatorState::Stopping;
        if self.stop.raise() {
            info!("Stop signal raised");
        }

        let summary = RunSummary {
            totals: self.counters.snapshot(),
            elapsed: self.started.elapsed(),
        };
        self.sink.emit(&Report::Final(summary));

        self.state = AggregatorState::Terminated;
        info!("Aggregator terminated after {:?}", summary.elapsed);
        summary
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
