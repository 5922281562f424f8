//! Performance profiling and reporting for the agent pool.

/// Smoothed per-agent metrics
pub mod profiler;
/// Report generation
pub mod reporter;

pub use profiler::PerformanceProfiler;
pub use reporter::{AgentBreakdown, PerformanceReporter, PoolReport};
