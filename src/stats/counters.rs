use std::sync::atomic::{AtomicU64, Ordering};

/// Attempt counters shared by every worker and read by the aggregator.
///
/// Each counter is an independent atomic so thousands of writers never
/// contend on a common lock.
#[derive(Debug, Default)]
pub struct Counters {
    total: AtomicU64,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) -> u64 {
        self.total.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn record_admitted(&self) -> u64 {
        self.admitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Acquire)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Acquire)
    }

    /// Reads all three counters. The values are not a single atomic cut;
    /// increments landing between the loads show up in the next sample.
    pub fn snapshot(&self) -> IntervalSample {
        IntervalSample {
            total: self.total(),
            admitted: self.admitted(),
            rejected: self.rejected(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalSample {
    pub total: u64,
    pub admitted: u64,
    pub rejected: u64,
}

impl IntervalSample {
    /// Component-wise difference against an earlier sample. Saturates at zero
    /// so a reordered read can never produce a negative delta.
    pub fn delta_since(&self, previous: &IntervalSample) -> IntervalSample {
        IntervalSample {
            total: self.total.saturating_sub(previous.total),
            admitted: self.admitted.saturating_sub(previous.admitted),
            rejected: self.rejected.saturating_sub(previous.rejected),
        }
    }
}
