mod counters;
mod stop;

pub use counters::{Counters, IntervalSample};
pub use stop::StopSignal;
