//! Weighted heuristic scoring of candidate agents.

use crate::matcher::CapabilityMatcher;
use conductor_core::{AgentId, AgentSnapshot, ScoringConfig, TaskRequest, TaskType};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Agent paired with its score for one request.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    /// Candidate agent
    pub agent: AgentSnapshot,
    /// Score, higher is better
    pub score: f64,
}

/// Scores agents for a request and keeps per-type predicted performance.
///
/// The score is
/// `success*w1 + 1/(responseTime+1)*w2 + throughput*w3 + matchRatio*w4 - load*w5`.
/// Predictions start at 0.5 and move towards each observed outcome by the
/// learning rate; they are reported but never feed the score.
pub struct PredictiveScorer {
    config: ScoringConfig,
    predictions: Mutex<HashMap<(TaskType, AgentId), f64>>,
}

impl PredictiveScorer {
    /// Prediction for a pair that has never been observed.
    pub const DEFAULT_PREDICTION: f64 = 0.5;

    /// Creates a scorer with the given weights.
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            predictions: Mutex::new(HashMap::new()),
        }
    }

    /// Scores one agent for a request.
    pub fn score(&self, agent: &AgentSnapshot, request: &TaskRequest) -> f64 {
        let weights = &self.config;
        let metrics = &agent.metrics;
        let latency = 1.0 / (metrics.average_response_time_ms.max(0.0) + 1.0);
        let match_ratio = CapabilityMatcher::match_ratio(agent, request);

        weights.success_weight * metrics.success_rate
            + weights.latency_weight * latency
            + weights.throughput_weight * metrics.throughput
            + weights.capability_weight * match_ratio
            - weights.load_weight * agent.load_factor
    }

    /// Scores every candidate and returns the best few, highest score first.
    /// Ties are broken by agent id.
    pub fn rank(&self, candidates: Vec<AgentSnapshot>, request: &TaskRequest) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|agent| {
                let score = self.score(&agent, request);
                trace!("Scored {} at {score:.4} for {}", agent.id, request.id);
                RankedCandidate { agent, score }
            })
            .collect();

        ranked.sort_by(|left, right| match right.score.total_cmp(&left.score) {
            Ordering::Equal => left.agent.id.cmp(&right.agent.id),
            ordering => ordering,
        });
        ranked.truncate(self.config.top_candidates.max(1));
        ranked
    }

    /// Predicted performance of an agent on a task type.
    pub fn predicted_performance(&self, task_type: TaskType, agent_id: &AgentId) -> f64 {
        self.predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(task_type, agent_id.clone()))
            .copied()
            .unwrap_or(Self::DEFAULT_PREDICTION)
    }

    /// Moves the prediction towards an observed outcome (1.0 success,
    /// 0.0 failure) and returns the new value.
    pub fn update_prediction(&self, task_type: TaskType, agent_id: &AgentId, observed: f64) -> f64 {
        let mut predictions = self
            .predictions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = predictions
            .entry((task_type, agent_id.clone()))
            .or_insert(Self::DEFAULT_PREDICTION);
        let updated = self
            .config
            .learning_rate
            .mul_add(observed - *current, *current)
            .clamp(0.0, 1.0);
        *current = updated;
        updated
    }
}
