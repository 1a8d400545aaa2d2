use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-way flag ending the measurement window. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag to stopped. Returns true only for the call that
    /// performed the transition.
    pub fn raise(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
