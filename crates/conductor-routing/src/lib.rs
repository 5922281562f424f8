//! Agent selection for the conductor orchestrator.
//!
//! Routing is split into capability matching ([`CapabilityMatcher`]),
//! heuristic scoring ([`PredictiveScorer`]), and the [`SmartRouter`] that
//! combines them. Performance samples fed back from dispatch live in the
//! [`PerformanceProfiler`]; free text is turned into task requests by a
//! [`TaskClassifier`].

/// Free-text task classification
pub mod classifier;
/// Capability matching
pub mod matcher;
/// Performance profiling and reporting
pub mod metrics;
/// Agent routers
pub mod router;
/// Predictive scoring
pub mod scorer;

pub use classifier::{Classification, KeywordClassifier, TaskClassifier};
pub use matcher::CapabilityMatcher;
pub use metrics::{AgentBreakdown, PerformanceProfiler, PerformanceReporter, PoolReport};
pub use router::{AgentRouter, RoutingDecision, SmartRouter};
pub use scorer::{PredictiveScorer, RankedCandidate};
