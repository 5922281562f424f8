//! Exponentially smoothed per-agent performance profile.

use conductor_core::{AgentId, EventBus, PerformanceMetrics, ProfilerConfig};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Tracks rolling metrics for every agent and publishes each update.
pub struct PerformanceProfiler {
    smoothing_factor: f64,
    metrics: Mutex<BTreeMap<AgentId, PerformanceMetrics>>,
    events: EventBus,
}

impl PerformanceProfiler {
    /// Creates an empty profiler publishing to `events`.
    pub fn new(config: &ProfilerConfig, events: EventBus) -> Self {
        Self {
            smoothing_factor: config.smoothing_factor,
            metrics: Mutex::new(BTreeMap::new()),
            events,
        }
    }

    /// Sets the starting metrics of an agent.
    pub fn seed(&self, agent_id: AgentId, metrics: PerformanceMetrics) {
        self.lock().insert(agent_id, metrics);
    }

    /// Folds one execution sample into the agent's profile and emits
    /// `MetricsUpdated`. Agents never seen before start from the unobserved
    /// defaults.
    pub fn record_metric(
        &self,
        agent_id: &AgentId,
        response_time_ms: f64,
        success: bool,
    ) -> PerformanceMetrics {
        let updated = {
            let mut metrics = self.lock();
            let entry = metrics
                .entry(agent_id.clone())
                .or_insert_with(PerformanceMetrics::unobserved);
            entry.apply_sample(self.smoothing_factor, response_time_ms, success);
            entry.clone()
        };

        debug!(
            "Agent {agent_id}: response {:.1}ms, success rate {:.3}",
            updated.average_response_time_ms, updated.success_rate
        );
        self.events.metrics_updated(agent_id.clone(), updated.clone());
        updated
    }

    /// Current metrics of an agent.
    pub fn metrics_for(&self, agent_id: &AgentId) -> PerformanceMetrics {
        self.lock()
            .get(agent_id)
            .cloned()
            .unwrap_or_else(PerformanceMetrics::unobserved)
    }

    /// Copy of every agent's metrics.
    pub fn snapshot(&self) -> BTreeMap<AgentId, PerformanceMetrics> {
        self.lock().clone()
    }

    /// Mean of the agents' average response times, `0.0` with no agents.
    pub fn average_response_time(&self) -> f64 {
        let metrics = self.lock();
        if metrics.is_empty() {
            return 0.0;
        }
        let total: f64 = metrics
            .values()
            .map(|profile| profile.average_response_time_ms)
            .sum();
        total / metrics.len() as f64
    }

    /// Emits `PerformanceReport` with every agent's metrics.
    pub fn emit_report(&self) {
        self.events.performance_report(self.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, PerformanceMetrics>> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
