use crate::stats::IntervalSample;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalReport {
    /// Budget left when this tick fired, before it was spent.
    pub remaining: u64,
    pub delta: IntervalSample,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub totals: IntervalSample,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Interval(IntervalReport),
    Final(RunSummary),
}

impl Report {
    pub fn render(&self) -> String {
        match self {
            Report::Interval(r) => format!(
                "{} send qps is: {}\n{}, total:{}, pass:{}, block:{}",
                r.remaining,
                r.delta.total,
                r.timestamp_ms,
                r.delta.total,
                r.delta.admitted,
                r.delta.rejected
            ),
            Report::Final(s) => format!(
                "time cost: {} ms\ntotal:{}, pass:{}, block:{}",
                s.elapsed.as_millis(),
                s.totals.total,
                s.totals.admitted,
                s.totals.rejected
            ),
        }
    }
}

pub trait ReportSink: Send {
    fn emit(&mut self, report: &Report);
}

/// Writes reports to process stdout, the operator-facing output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&mut self, report: &Report) {
        println!("{}", report.render());
    }
}

impl ReportSink for mpsc::UnboundedSender<Report> {
    fn emit(&mut self, report: &Report) {
        // a dropped receiver only means nobody is listening any more
        let _ = self.send(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_interval() {
        let report = Report::Interval(IntervalReport {
            remaining: 42,
            delta: IntervalSample {
                total: 900,
                admitted: 500,
                rejected: 400,
            },
            timestamp_ms: 1_700_000_000_000,
        });

        assert_eq!(
            report.render(),
            "42 send qps is: 900\n1700000000000, total:900, pass:500, block:400"
        );
    }

    #[test]
    fn test_render_final() {
        let report = Report::Final(RunSummary {
            totals: IntervalSample {
                total: 10,
                admitted: 6,
                rejected: 3,
            },
            elapsed: Duration::from_millis(3004),
        });

        assert_eq!(report.render(), "time cost: 3004 ms\ntotal:10, pass:6, block:3");
    }
}
