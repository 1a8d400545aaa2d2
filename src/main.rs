use anyhow::Result;
use flowqps::aggregator::{Aggregator, StdoutSink};
use flowqps::config::Config;
use flowqps::gate::FlowGate;
use flowqps::stats::{Counters, StopSignal};
use flowqps::traffic::WorkerPool;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowqps=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting flowqps");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            Config::from_file(&path)?
        }
        None => {
            info!(
                "Loading config from {} if present, else built-in defaults",
                Config::DEFAULT_PATH
            );
            Config::from_file_or_default(Config::DEFAULT_PATH)?
        }
    };
    let harness = &config.harness;

    let gate = Arc::new(FlowGate::with_rules(config.rules.clone())?);
    if let Some(rule) = gate.rule(&harness.resource) {
        info!(
            "Flow control on {}: {:?} limit of {}",
            harness.resource, rule.grade, rule.count
        );
    } else {
        info!("No rule for {}, every request will pass", harness.resource);
    }

    let counters = Arc::new(Counters::new());
    let stop = StopSignal::new();

    let aggregator = Aggregator::new(
        counters.clone(),
        stop.clone(),
        harness.duration_seconds,
        harness.tick(),
        StdoutSink,
    );
    let aggregation = tokio::spawn(aggregator.run());

    let pool = WorkerPool::new(gate.clone(), counters, harness.max_pause());
    let workers = pool.launch(harness.worker_count, &harness.resource, &stop);

    let summary = aggregation.await?;
    info!(
        "Measurement window closed: total={}, pass={}, block={}",
        summary.totals.total, summary.totals.admitted, summary.totals.rejected
    );

    if let Some(timeout) = config.shutdown.join_timeout() {
        let report = workers.drain(timeout).await;
        info!(
            "Drained workers: {} finished, {} failed, {} abandoned",
            report.finished, report.failed, report.abandoned
        );
        info!(
            "Permits still in flight on {}: {}",
            harness.resource,
            gate.in_flight(&harness.resource)
        );
    }

    std::process::exit(0);
}
