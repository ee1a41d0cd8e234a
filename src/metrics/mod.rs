//! Post-run performance statistics.

pub mod calculator;

pub use calculator::{MetricsCalculator, PerformanceMetrics};
