//! Agent pool state and exclusive task leases.

use conductor_core::{
    Agent, AgentId, AgentSnapshot, AgentSpec, AgentStatus, DispatchError, Result, TaskId,
};
use conductor_routing::PerformanceProfiler;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Fixed pool of agents, keyed by id.
///
/// The only way to make an agent busy is [`AgentRegistry::try_assign`], which
/// hands out an [`AgentLease`]; the agent goes back to idle when the lease is
/// released or dropped.
pub struct AgentRegistry {
    agents: Mutex<BTreeMap<AgentId, Agent>>,
    load_step: f64,
}

impl AgentRegistry {
    /// Builds the pool from its definitions.
    ///
    /// # Errors
    /// Returns `DuplicateAgent` if two definitions share an id
    pub fn new(specs: &[AgentSpec], load_step: f64) -> Result<Self> {
        let mut agents = BTreeMap::new();
        for spec in specs {
            if agents.insert(spec.id.clone(), Agent::from_spec(spec)).is_some() {
                return Err(DispatchError::DuplicateAgent(spec.id.clone()));
            }
        }
        Ok(Self {
            agents: Mutex::new(agents),
            load_step,
        })
    }

    /// Number of agents in the pool.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Agents that are not offline.
    pub fn active_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|agent| agent.status() != AgentStatus::Offline)
            .count()
    }

    /// Every agent joined with its metrics, in id order.
    pub fn snapshots(&self, profiler: &PerformanceProfiler) -> Vec<AgentSnapshot> {
        let agents: Vec<Agent> = self.lock().values().cloned().collect();
        agents
            .iter()
            .map(|agent| agent.snapshot(profiler.metrics_for(agent.id())))
            .collect()
    }

    /// One agent joined with its metrics.
    pub fn snapshot(&self, agent_id: &AgentId, profiler: &PerformanceProfiler) -> Option<AgentSnapshot> {
        let agent = self.lock().get(agent_id).cloned()?;
        Some(agent.snapshot(profiler.metrics_for(agent_id)))
    }

    /// Atomically moves an idle agent to busy for `task_id`.
    ///
    /// Returns `None` and changes nothing if the agent is unknown, not idle,
    /// or already holds a task.
    pub fn try_assign(self: &Arc<Self>, agent_id: &AgentId, task_id: TaskId) -> Option<AgentLease> {
        let assigned = self
            .lock()
            .get_mut(agent_id)
            .is_some_and(|agent| agent.try_begin_task(task_id, self.load_step));
        if !assigned {
            return None;
        }
        debug!("Agent {agent_id} leased for {task_id}");
        Some(AgentLease {
            registry: Arc::clone(self),
            agent_id: agent_id.clone(),
            task_id,
            released: false,
        })
    }

    /// Operator status override.
    ///
    /// # Errors
    /// Returns `UnknownAgent` for an id outside the pool, or
    /// `InvalidStatusTransition` for a change the agent refuses
    pub fn set_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()> {
        let mut agents = self.lock();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| DispatchError::UnknownAgent(agent_id.clone()))?;
        agent.set_status(status)?;
        info!("Agent {agent_id} set to {status}");
        Ok(())
    }

    fn release(&self, agent_id: &AgentId) {
        if let Some(agent) = self.lock().get_mut(agent_id) {
            agent.finish_task(self.load_step);
        }
        debug!("Agent {agent_id} released");
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, Agent>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on a busy agent. Releasing it (explicitly or on drop)
/// returns the agent to idle and removes the load step.
pub struct AgentLease {
    registry: Arc<AgentRegistry>,
    agent_id: AgentId,
    task_id: TaskId,
    released: bool,
}

impl AgentLease {
    /// Leased agent.
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Task the agent was leased for.
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Releases the agent now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(&self.agent_id);
        }
    }
}

impl Drop for AgentLease {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{EventBus, ProfilerConfig};

    fn registry() -> Arc<AgentRegistry> {
        Arc::new(AgentRegistry::new(&AgentSpec::default_pool(), 0.1).expect("registry"))
    }

    fn load_of(registry: &AgentRegistry, agent_id: &AgentId) -> f64 {
        let profiler = PerformanceProfiler::new(&ProfilerConfig::default(), EventBus::new());
        registry
            .snapshot(agent_id, &profiler)
            .expect("agent")
            .load_factor
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let spec = AgentSpec::new("twin", "Twin", ["x"]);
        let result = AgentRegistry::new(&[spec.clone(), spec], 0.1);
        assert!(matches!(result, Err(DispatchError::DuplicateAgent(_))));
    }

    #[test]
    fn test_lease_is_exclusive() {
        let registry = registry();
        let agent_id = AgentId::from("full-stack-dev");
        let lease = registry
            .try_assign(&agent_id, TaskId::default())
            .expect("first lease");
        assert!(registry.try_assign(&agent_id, TaskId::default()).is_none());
        assert!((load_of(&registry, &agent_id) - 0.2).abs() < 1e-9);

        lease.release();
        assert!((load_of(&registry, &agent_id) - 0.1).abs() < 1e-9);
        assert!(registry.try_assign(&agent_id, TaskId::default()).is_some());
    }

    #[test]
    fn test_dropped_lease_releases() {
        let registry = registry();
        let agent_id = AgentId::from("mobile-expert");
        {
            let _lease = registry.try_assign(&agent_id, TaskId::default());
        }
        let profiler = PerformanceProfiler::new(&ProfilerConfig::default(), EventBus::new());
        let snapshot = registry.snapshot(&agent_id, &profiler).expect("agent");
        assert_eq!(snapshot.status, AgentStatus::Idle);
        assert!(snapshot.current_task.is_none());
    }

    #[test]
    fn test_offline_survives_release() {
        let registry = registry();
        let agent_id = AgentId::from("security-specialist");
        let lease = registry
            .try_assign(&agent_id, TaskId::default())
            .expect("lease");
        registry
            .set_status(&agent_id, AgentStatus::Offline)
            .expect("offline");
        drop(lease);

        assert_eq!(registry.active_count(), 9);
        assert!(registry.try_assign(&agent_id, TaskId::default()).is_none());
    }

    #[test]
    fn test_unknown_agent() {
        let registry = registry();
        let ghost = AgentId::from("ghost");
        assert!(registry.try_assign(&ghost, TaskId::default()).is_none());
        assert!(matches!(
            registry.set_status(&ghost, AgentStatus::Idle),
            Err(DispatchError::UnknownAgent(_))
        ));
    }
}
