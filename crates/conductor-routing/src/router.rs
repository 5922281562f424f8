//! Agent selection.

use crate::matcher::CapabilityMatcher;
use crate::scorer::{PredictiveScorer, RankedCandidate};
use conductor_core::{AgentSnapshot, AgentStatus, TaskRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Routing decision with rationale
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    /// Chosen agent
    pub agent: AgentSnapshot,
    /// Score of the chosen agent
    pub score: f64,
    /// Chosen from busy agents because no idle agent could take the task
    pub fallback: bool,
    /// Ranked idle candidates, best first (empty for a fallback)
    pub candidates: Vec<RankedCandidate>,
    /// Human-readable explanation
    pub reasoning: String,
}

/// Strategy for picking an agent for a request.
pub trait AgentRouter: Send + Sync {
    /// Picks an idle agent that can handle the request. Used for dispatch.
    fn route(&self, request: &TaskRequest, agents: &[AgentSnapshot]) -> Option<RoutingDecision>;

    /// Like [`AgentRouter::route`], but falls back to the least loaded busy
    /// capable agent. Advisory only; never used for dispatch.
    fn suggest(&self, request: &TaskRequest, agents: &[AgentSnapshot]) -> Option<RoutingDecision>;
}

/// Capability-filtered, score-ranked router.
pub struct SmartRouter {
    scorer: Arc<PredictiveScorer>,
}

impl SmartRouter {
    /// Creates a router that ranks with `scorer`.
    pub const fn new(scorer: Arc<PredictiveScorer>) -> Self {
        Self { scorer }
    }

    fn capable(
        request: &TaskRequest,
        agents: &[AgentSnapshot],
        status: AgentStatus,
    ) -> Vec<AgentSnapshot> {
        agents
            .iter()
            .filter(|agent| agent.status == status && CapabilityMatcher::can_handle(agent, request))
            .cloned()
            .collect()
    }

    fn busy_fallback(
        &self,
        request: &TaskRequest,
        agents: &[AgentSnapshot],
    ) -> Option<RoutingDecision> {
        let mut busy = Self::capable(request, agents, AgentStatus::Busy);
        busy.sort_by(|left, right| {
            left.load_factor
                .total_cmp(&right.load_factor)
                .then_with(|| left.id.cmp(&right.id))
        });
        let agent = busy.into_iter().next()?;
        let score = self.scorer.score(&agent, request);
        let reasoning = format!(
            "No idle agent can take {}; {} is the least loaded busy agent ({:.2})",
            request.task_type, agent.id, agent.load_factor
        );
        Some(RoutingDecision {
            agent,
            score,
            fallback: true,
            candidates: Vec::new(),
            reasoning,
        })
    }
}

impl AgentRouter for SmartRouter {
    fn route(&self, request: &TaskRequest, agents: &[AgentSnapshot]) -> Option<RoutingDecision> {
        let idle = Self::capable(request, agents, AgentStatus::Idle);
        if idle.is_empty() {
            debug!("No idle agent matches {} ({})", request.id, request.task_type);
            return None;
        }

        let candidates = self.scorer.rank(idle, request);
        let best = candidates.first()?;
        let reasoning = format!(
            "{} scored {:.3} for {} among {} candidate(s)",
            best.agent.id,
            best.score,
            request.task_type,
            candidates.len()
        );
        Some(RoutingDecision {
            agent: best.agent.clone(),
            score: best.score,
            fallback: false,
            candidates,
            reasoning,
        })
    }

    fn suggest(&self, request: &TaskRequest, agents: &[AgentSnapshot]) -> Option<RoutingDecision> {
        self.route(request, agents)
            .or_else(|| self.busy_fallback(request, agents))
    }
}
