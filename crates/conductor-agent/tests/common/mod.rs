//! Common test utilities for conductor-agent tests
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use async_trait::async_trait;
use conductor_agent::{ExecutionReport, Executor};
use conductor_core::{
    AgentId, AgentSnapshot, AgentSpec, DispatchConfig, DispatchError, EventStream,
    OrchestratorEvent, Result, TaskId, TaskRequest, TaskType,
};
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

/// Metadata key selecting what [`ScriptedExecutor`] does with a task.
pub const BEHAVIOR_KEY: &str = "behavior";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (idempotent).
/// Honors `RUST_LOG` if set, otherwise defaults to "debug".
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_owned());
        if fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .try_init()
            .is_err()
        {
            // already initialized in this process
        }
    });
}

/// Config over `agents` with the given concurrency limit.
pub fn config(agents: Vec<AgentSpec>, concurrency: usize) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.agents = agents;
    config.scheduler.max_concurrent_tasks = concurrency;
    config.scheduler.tick_interval_ms = 20;
    config
}

/// `count` agents that all carry the `work` capability.
pub fn workers(count: usize) -> Vec<AgentSpec> {
    (0..count)
        .map(|index| AgentSpec::new(format!("worker-{index:02}"), "Worker", ["work"]))
        .collect()
}

/// Request that only `work` agents can take.
pub fn work(behavior: &str) -> TaskRequest {
    TaskRequest::new(TaskType::ImplementFeature)
        .with_requirements(["work"])
        .with_metadata(BEHAVIOR_KEY, behavior)
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(events: &mut EventStream) -> OrchestratorEvent {
    timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("event in time")
        .expect("event stream open")
}

/// Collects events until `terminal` tasks have finished.
pub async fn collect_terminal(events: &mut EventStream, terminal: usize) -> Vec<OrchestratorEvent> {
    let mut collected = Vec::new();
    let mut finished = 0;
    while finished < terminal {
        let event = next_event(events).await;
        if event.is_terminal() {
            finished += 1;
        }
        collected.push(event);
    }
    collected
}

/// Ids of `TaskStarted` events in emission order.
pub fn started_order(events: &[OrchestratorEvent]) -> Vec<TaskId> {
    events
        .iter()
        .filter_map(|event| match event {
            OrchestratorEvent::TaskStarted { task_id, .. } => Some(*task_id),
            _ => None,
        })
        .collect()
}

/// Executor driven by each request's `behavior` metadata:
///
/// * `ok` succeeds after a short sleep
/// * `fail` returns a failed report
/// * `error` returns `Err`
/// * `panic` panics
/// * `gate` waits for [`ScriptedExecutor::open_gate`]
/// * `block` waits for cancellation
/// * `slow` sleeps for a minute unless cancelled
#[derive(Default)]
pub struct ScriptedExecutor {
    calls: AtomicUsize,
    running: Mutex<HashMap<AgentId, usize>>,
    max_per_agent: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    loads: Mutex<Vec<f64>>,
    gate: Notify,
}

impl ScriptedExecutor {
    /// New executor behind an `Arc`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lets one gated task finish.
    pub fn open_gate(&self) {
        self.gate.notify_one();
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most tasks ever seen running at once on a single agent.
    pub fn max_per_agent(&self) -> usize {
        self.max_per_agent.load(Ordering::SeqCst)
    }

    /// Most tasks ever seen running at once overall.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Load factor of every agent snapshot handed to `execute`.
    pub fn observed_loads(&self) -> Vec<f64> {
        self.loads.lock().expect("loads lock").clone()
    }

    fn enter(&self, agent: &AgentSnapshot) {
        self.loads.lock().expect("loads lock").push(agent.load_factor);
        let agent_id = &agent.id;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let mut running = self.running.lock().expect("running lock");
        let count = running.entry(agent_id.clone()).or_default();
        *count += 1;
        self.max_per_agent.fetch_max(*count, Ordering::SeqCst);
    }

    fn exit(&self, agent_id: &AgentId) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut running = self.running.lock().expect("running lock");
        if let Some(count) = running.get_mut(agent_id) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(
        &self,
        request: &TaskRequest,
        agent: &AgentSnapshot,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        self.enter(agent);
        let behavior = request
            .metadata
            .get(BEHAVIOR_KEY)
            .and_then(Value::as_str)
            .unwrap_or("ok");

        let result = match behavior {
            "fail" => Ok(ExecutionReport::failed(1, "scripted failure")),
            "error" => Err(DispatchError::ExecutionFailed("scripted error".to_owned())),
            "panic" => {
                self.exit(&agent.id);
                panic!("scripted panic");
            }
            "gate" => {
                self.gate.notified().await;
                Ok(ExecutionReport::succeeded(1, "gate opened"))
            }
            "block" => {
                cancel.cancelled().await;
                Err(DispatchError::ExecutionFailed("cancelled".to_owned()))
            }
            "slow" => tokio::select! {
                () = sleep(Duration::from_secs(60)) => Ok(ExecutionReport::succeeded(60_000, "slow")),
                () = cancel.cancelled() => Err(DispatchError::ExecutionFailed("cancelled".to_owned())),
            },
            _ => {
                sleep(Duration::from_millis(5)).await;
                Ok(ExecutionReport::succeeded(5, "done"))
            }
        };
        self.exit(&agent.id);
        result
    }
}
