//! Task orchestration over the agent pool.
//!
//! Submissions go into a FIFO [`TaskQueue`]. A single background dispatch
//! task drains it, asks the router for an idle capable agent, leases that
//! agent, and runs the task through the [`Executor`]. A second background
//! task publishes periodic performance reports. Both stop on
//! [`Orchestrator::shutdown`].

mod dispatch;
mod status;

pub use status::{ActiveTaskRecord, OrchestratorStatus, Recommendation, TaskHandle};

use crate::executor::{CommandExecutor, Executor};
use crate::queue::{QueuedTask, TaskQueue};
use crate::registry::AgentRegistry;
use conductor_core::{
    AgentId, AgentSnapshot, AgentStatus, Complexity, DispatchConfig, DispatchError, EventBus,
    EventStream, Priority, Result, TaskContext, TaskId, TaskRequest, TaskType,
};
use conductor_routing::{
    AgentRouter, KeywordClassifier, PerformanceProfiler, PerformanceReporter, PoolReport,
    PredictiveScorer, SmartRouter, TaskClassifier,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// State shared by the public handle and the background tasks.
struct OrchestratorContext {
    config: DispatchConfig,
    registry: Arc<AgentRegistry>,
    queue: TaskQueue,
    profiler: PerformanceProfiler,
    scorer: Arc<PredictiveScorer>,
    router: Arc<dyn AgentRouter>,
    executor: Arc<dyn Executor>,
    classifier: Arc<dyn TaskClassifier>,
    events: EventBus,
    active: Mutex<HashMap<TaskId, ActiveTaskRecord>>,
    shutdown: CancellationToken,
}

impl OrchestratorContext {
    fn active(&self) -> MutexGuard<'_, HashMap<TaskId, ActiveTaskRecord>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`Orchestrator`]; unset collaborators get the defaults.
pub struct OrchestratorBuilder {
    config: DispatchConfig,
    executor: Option<Arc<dyn Executor>>,
    classifier: Option<Arc<dyn TaskClassifier>>,
    router: Option<Arc<dyn AgentRouter>>,
}

impl OrchestratorBuilder {
    /// Starts a builder from configuration.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            executor: None,
            classifier: None,
            router: None,
        }
    }

    /// Uses `executor` instead of a [`CommandExecutor`].
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Uses `classifier` instead of the [`KeywordClassifier`].
    #[must_use]
    pub fn classifier(mut self, classifier: Arc<dyn TaskClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Uses `router` instead of a [`SmartRouter`].
    #[must_use]
    pub fn router(mut self, router: Arc<dyn AgentRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Validates the configuration and assembles the orchestrator.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn build(self) -> Result<Orchestrator> {
        let config = self.config;
        config.validate()?;

        let events = EventBus::new();
        let registry = Arc::new(AgentRegistry::new(
            &config.agents,
            config.scheduler.load_step,
        )?);
        let profiler = PerformanceProfiler::new(&config.profiler, events.clone());
        for spec in &config.agents {
            profiler.seed(spec.id.clone(), spec.metrics.clone().unwrap_or_default());
        }

        let scorer = Arc::new(PredictiveScorer::new(config.scoring.clone()));
        let router = self
            .router
            .unwrap_or_else(|| Arc::new(SmartRouter::new(Arc::clone(&scorer))));
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(CommandExecutor::new(config.executor.clone())));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(KeywordClassifier));

        let context = OrchestratorContext {
            config,
            registry,
            queue: TaskQueue::new(),
            profiler,
            scorer,
            router,
            executor,
            classifier,
            events,
            active: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        };

        Ok(Orchestrator {
            context: Arc::new(context),
            workers: Mutex::new(None),
        })
    }
}

struct Workers {
    dispatch: JoinHandle<()>,
    reporter: JoinHandle<()>,
}

/// Schedules tasks onto the agent pool.
pub struct Orchestrator {
    context: Arc<OrchestratorContext>,
    workers: Mutex<Option<Workers>>,
}

impl Orchestrator {
    /// Builds an orchestrator with the default collaborators.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn new(config: DispatchConfig) -> Result<Self> {
        OrchestratorBuilder::new(config).build()
    }

    /// Starts a builder.
    pub fn builder(config: DispatchConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Emits `AgentsInitialized` and spawns the dispatch loop and the
    /// performance reporter on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` on a second call, `ShutDown` after shutdown,
    /// or an error when called outside a Tokio runtime
    pub fn start(&self) -> Result<()> {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if workers.is_some() {
            return Err(DispatchError::AlreadyStarted);
        }
        if self.context.shutdown.is_cancelled() {
            return Err(DispatchError::ShutDown);
        }
        let runtime = Handle::try_current()
            .map_err(|error| DispatchError::Other(format!("No Tokio runtime: {error}")))?;

        let agent_count = self.context.registry.len();
        self.context.events.agents_initialized(agent_count);
        info!(
            "Orchestrator started with {agent_count} agents, concurrency {}",
            self.context.config.scheduler.max_concurrent_tasks
        );

        let dispatch = runtime.spawn(dispatch::run_dispatch_loop(Arc::clone(&self.context)));
        let reporter = runtime.spawn(dispatch::run_reporter(Arc::clone(&self.context)));
        *workers = Some(Workers { dispatch, reporter });
        Ok(())
    }

    /// Stops the background tasks. Running tasks are cancelled and queued
    /// tasks fail with `ShutDown`; every submitted task still gets exactly
    /// one terminal event.
    pub async fn shutdown(&self) {
        info!("Orchestrator shutting down");
        self.context.shutdown.cancel();

        let workers = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(workers) = workers {
            if let Err(error) = workers.dispatch.await {
                error!("Dispatch loop ended abnormally: {error}");
            }
            if let Err(error) = workers.reporter.await {
                error!("Performance reporter ended abnormally: {error}");
            }
        }
        dispatch::fail_queued(&self.context);
    }

    /// Whether shutdown has begun.
    pub fn is_shut_down(&self) -> bool {
        self.context.shutdown.is_cancelled()
    }

    /// Subscribes to orchestrator events.
    pub fn subscribe(&self) -> EventStream {
        self.context.events.subscribe()
    }

    /// Queues a request and returns its id immediately.
    ///
    /// # Errors
    /// Returns `ShutDown` after shutdown
    pub fn submit_task(&self, request: TaskRequest) -> Result<TaskId> {
        let task_id = request.id;
        self.enqueue(QueuedTask::detached(request))?;
        Ok(task_id)
    }

    /// Queues a request and returns a handle resolving to its outcome.
    ///
    /// # Errors
    /// Returns `ShutDown` after shutdown
    pub fn submit_task_tracked(&self, request: TaskRequest) -> Result<TaskHandle> {
        let task_id = request.id;
        let (sender, receiver) = oneshot::channel();
        self.enqueue(QueuedTask {
            request,
            waiter: Some(sender),
        })?;
        Ok(TaskHandle::new(task_id, receiver))
    }

    fn enqueue(&self, task: QueuedTask) -> Result<()> {
        let events = &self.context.events;
        self.context.queue.push(task, |request| {
            debug!("Queued {} ({})", request.id, request.task_type);
            events.task_queued(request);
        })
    }

    /// Builds a request with the type's default requirements, context
    /// defaults, and estimate metadata.
    pub fn create_task<I, S>(
        &self,
        task_type: TaskType,
        description: &str,
        requirements: I,
        priority: Priority,
        context: Option<TaskContext>,
    ) -> TaskRequest
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = requirements
            .into_iter()
            .map(|tag| tag.as_ref().trim().to_owned())
            .filter(|tag| !tag.is_empty())
            .collect();
        let complexity = Complexity::assess(task_type, extra.len());
        let estimated_ms =
            u64::try_from(task_type.estimated_duration().as_millis()).unwrap_or(u64::MAX);
        let context = self.context.config.defaults.fill(context, description);

        let request = TaskRequest::new(task_type)
            .with_priority(priority)
            .with_context(context)
            .with_requirements(task_type.default_requirements())
            .with_requirements(&extra);
        let created_at = request.created_at.to_rfc3339();
        request
            .with_metadata("created_at", created_at)
            .with_metadata("estimated_duration_ms", estimated_ms)
            .with_metadata("complexity", Value::from(complexity.as_str()))
    }

    /// Builds and queues a request, see [`Orchestrator::create_task`].
    ///
    /// # Errors
    /// Returns `ShutDown` after shutdown
    pub fn create_and_submit_task<I, S>(
        &self,
        task_type: TaskType,
        description: &str,
        requirements: I,
        priority: Priority,
        context: Option<TaskContext>,
    ) -> Result<TaskId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.submit_task(self.create_task(task_type, description, requirements, priority, context))
    }

    /// Classifies a description and builds the matching request.
    pub async fn request_from_description(&self, text: &str) -> TaskRequest {
        let classification = self.context.classifier.classify(text).await;
        self.create_task(
            classification.task_type,
            text,
            &classification.requirements,
            classification.priority,
            None,
        )
    }

    /// Classifies a description and queues it.
    ///
    /// # Errors
    /// Returns `ShutDown` after shutdown
    pub async fn submit_description(&self, text: &str) -> Result<TaskId> {
        let request = self.request_from_description(text).await;
        self.submit_task(request)
    }

    /// Current counters. Never waits on running tasks.
    pub fn get_status(&self) -> OrchestratorStatus {
        let context = &self.context;
        OrchestratorStatus {
            total_agents: context.registry.len(),
            active_agents: context.registry.active_count(),
            queue_length: context.queue.len(),
            active_task_count: context.active().len(),
            average_response_time_ms: context.profiler.average_response_time(),
        }
    }

    /// Agent the router would pick right now, falling back to the least
    /// loaded busy capable agent. Changes nothing.
    pub fn get_best_agent_for<I, S>(&self, task_type: TaskType, requirements: I) -> Option<AgentSnapshot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let request = TaskRequest::new(task_type)
            .with_requirements(task_type.default_requirements())
            .with_requirements(requirements);
        let agents = self.agents();
        self.context
            .router
            .suggest(&request, &agents)
            .map(|decision| decision.agent)
    }

    /// Classifies a description and reports what would happen to it.
    pub async fn get_recommendations_for(&self, text: &str) -> Recommendation {
        let classification = self.context.classifier.classify(text).await;
        let request = self.create_task(
            classification.task_type,
            text,
            &classification.requirements,
            classification.priority,
            None,
        );
        let agents = self.agents();
        let recommended_agent = self
            .context
            .router
            .suggest(&request, &agents)
            .map(|decision| decision.agent);

        Recommendation {
            suggested_task_type: request.task_type,
            recommended_agent,
            estimated_duration_ms: u64::try_from(
                request.task_type.estimated_duration().as_millis(),
            )
            .unwrap_or(u64::MAX),
            requirements: classification.requirements,
            priority: request.priority,
        }
    }

    /// Every agent with its metrics, in id order.
    pub fn agents(&self) -> Vec<AgentSnapshot> {
        self.context.registry.snapshots(&self.context.profiler)
    }

    /// Tasks currently running, oldest first.
    pub fn active_tasks(&self) -> Vec<ActiveTaskRecord> {
        let mut records: Vec<ActiveTaskRecord> = self.context.active().values().cloned().collect();
        records.sort_by_key(|record| record.started_at);
        records
    }

    /// Learned performance of an agent on a task type.
    pub fn predicted_performance(&self, task_type: TaskType, agent_id: &AgentId) -> f64 {
        self.context.scorer.predicted_performance(task_type, agent_id)
    }

    /// Operator status override for an agent.
    ///
    /// # Errors
    /// Returns `UnknownAgent` or `InvalidStatusTransition`
    pub fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<()> {
        self.context.registry.set_status(agent_id, status)
    }

    /// Summary of the pool's current metrics.
    pub fn performance_report(&self) -> PoolReport {
        PerformanceReporter::summarize(&self.context.profiler.snapshot())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.context.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::OrchestratorEvent;

    #[test]
    fn test_create_task_metadata() {
        let orchestrator = Orchestrator::new(DispatchConfig::default()).expect("orchestrator");
        let request = orchestrator.create_task(
            TaskType::AddTests,
            "cover the booking flow",
            ["a", "b", "c", "d", "e", "f"],
            Priority::High,
            None,
        );

        assert_eq!(request.description(), "cover the booking flow");
        assert_eq!(request.context.project_id, "default");
        assert!(request.requirements.contains("jest"));
        assert!(request.requirements.contains("f"));
        assert_eq!(request.metadata["complexity"], "medium");
        assert_eq!(request.metadata["estimated_duration_ms"], 1_200_000_u64);
        assert!(request.metadata.contains_key("created_at"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DispatchConfig::default();
        config.scheduler.max_concurrent_tasks = 0;
        assert!(Orchestrator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let orchestrator = Orchestrator::new(DispatchConfig::default()).expect("orchestrator");
        let mut events = orchestrator.subscribe();
        orchestrator.start().expect("start");
        assert!(matches!(
            orchestrator.start(),
            Err(DispatchError::AlreadyStarted)
        ));
        assert_eq!(
            events.recv().await,
            Some(OrchestratorEvent::AgentsInitialized { count: 10 })
        );
        orchestrator.shutdown().await;
        assert!(orchestrator.is_shut_down());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let orchestrator = Orchestrator::new(DispatchConfig::default()).expect("orchestrator");
        assert!(orchestrator.start().is_err());
    }

    #[tokio::test]
    async fn test_status_of_idle_pool() {
        let orchestrator = Orchestrator::new(DispatchConfig::default()).expect("orchestrator");
        let status = orchestrator.get_status();
        assert_eq!(status.total_agents, 10);
        assert_eq!(status.active_agents, 10);
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.active_task_count, 0);
        assert!((status.average_response_time_ms - 500.0).abs() < 1e-9);
    }
}
