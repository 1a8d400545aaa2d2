//! Load harness that drives concurrent traffic through an admission gate and
//! reports per-second pass/block counts for a fixed measurement window.

pub mod aggregator;
pub mod config;
pub mod gate;
pub mod stats;
pub mod traffic;
