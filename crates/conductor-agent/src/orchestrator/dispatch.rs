//! Dispatch loop, per-task execution, and the performance reporter.

use super::{ActiveTaskRecord, OrchestratorContext};
use crate::queue::QueuedTask;
use crate::registry::AgentLease;
use chrono::Utc;
use conductor_core::{AgentId, AgentSnapshot, AgentStatus, ErrorKind, TaskOutcome, TaskRequest};
use conductor_routing::CapabilityMatcher;
use futures::FutureExt as _;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

/// Result of trying to place the head of the queue.
enum Placement {
    /// Agent leased; run the task
    Leased(AgentLease, AgentSnapshot),
    /// Capable agents exist but are all busy; retry after a task finishes
    Wait,
    /// No agent can take the task
    Unroutable,
}

/// Drains the queue until shutdown. Only one instance runs per orchestrator,
/// so drain passes never overlap.
pub(super) async fn run_dispatch_loop(context: Arc<OrchestratorContext>) {
    let scheduler = &context.config.scheduler;
    let limit = scheduler.max_concurrent_tasks.max(1);
    let mut ticker = interval(scheduler.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: JoinSet<()> = JoinSet::new();

    debug!("Dispatch loop running, up to {limit} task(s) in flight");

    loop {
        drain(&context, &mut in_flight, limit);

        tokio::select! {
            biased;
            () = context.shutdown.cancelled() => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join_error(joined);
            }
            () = context.queue.notified() => {}
            _ = ticker.tick() => {}
        }
    }

    info!("Dispatch loop stopping, waiting for {} running task(s)", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        log_join_error(joined);
    }
    fail_queued(&context);
}

fn log_join_error(joined: Result<(), JoinError>) {
    if let Err(join_error) = joined {
        error!("Task worker ended abnormally: {join_error}");
    }
}

/// Emits `PerformanceReport` on every report tick until shutdown.
pub(super) async fn run_reporter(context: Arc<OrchestratorContext>) {
    let mut ticker = interval(context.config.profiler.report_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            () = context.shutdown.cancelled() => break,
            _ = ticker.tick() => context.profiler.emit_report(),
        }
    }
}

/// Fails every queued task with `ShutDown` and closes the queue.
pub(super) fn fail_queued(context: &OrchestratorContext) {
    for task in context.queue.close() {
        finish(
            context,
            task,
            TaskOutcome::failed(ErrorKind::ShutDown, "Orchestrator shut down before dispatch"),
            None,
        );
    }
}

/// Starts queued tasks in FIFO order while there is room.
fn drain(context: &Arc<OrchestratorContext>, in_flight: &mut JoinSet<()>, limit: usize) {
    while in_flight.len() < limit && !context.shutdown.is_cancelled() {
        let Some(task) = context.queue.pop_front() else {
            break;
        };

        match place(context, &task.request, !in_flight.is_empty()) {
            Placement::Leased(lease, agent) => {
                let agent_id = lease.agent_id().clone();
                context.active().insert(
                    task.request.id,
                    ActiveTaskRecord {
                        task: task.request.clone(),
                        agent_id: agent_id.clone(),
                        started_at: Utc::now(),
                    },
                );
                info!("Starting {} on {agent_id}", task.request.id);
                context.events.task_started(task.request.id, agent_id);
                in_flight.spawn(run_task(Arc::clone(context), task, lease, agent));
            }
            Placement::Wait => {
                debug!("{} waits for a busy agent", task.request.id);
                context.queue.push_front(task);
                break;
            }
            Placement::Unroutable => {
                let detail = format!(
                    "No suitable agent available for {} ({})",
                    task.request.id, task.request.task_type
                );
                warn!("{detail}");
                finish(
                    context,
                    task,
                    TaskOutcome::failed(ErrorKind::NoAgentAvailable, detail),
                    None,
                );
            }
        }
    }
}

/// Routes a request and leases the chosen agent.
fn place(context: &Arc<OrchestratorContext>, request: &TaskRequest, can_wait: bool) -> Placement {
    // A route can lose its agent to an operator status change between the
    // snapshot and the lease; retry with a fresh snapshot.
    for _ in 0..=context.registry.len() {
        let agents = context.registry.snapshots(&context.profiler);
        let Some(decision) = context.router.route(request, &agents) else {
            let busy_capable = agents.iter().any(|agent| {
                agent.status == AgentStatus::Busy && CapabilityMatcher::can_handle(agent, request)
            });
            return if can_wait && busy_capable {
                Placement::Wait
            } else {
                Placement::Unroutable
            };
        };

        debug!("{}", decision.reasoning);
        if let Some(lease) = context.registry.try_assign(&decision.agent.id, request.id) {
            let agent = context
                .registry
                .snapshot(&decision.agent.id, &context.profiler)
                .unwrap_or(decision.agent);
            return Placement::Leased(lease, agent);
        }
    }
    Placement::Unroutable
}

/// Runs one leased task to its terminal event.
async fn run_task(
    context: Arc<OrchestratorContext>,
    task: QueuedTask,
    lease: AgentLease,
    agent: AgentSnapshot,
) {
    let request = &task.request;
    let agent_id = lease.agent_id().clone();
    let started = Instant::now();

    let outcome = match remaining_time(&context, request) {
        Some(limit) if limit.is_zero() => TaskOutcome::failed(
            ErrorKind::DeadlineExceeded,
            format!("Deadline for {} passed before it started", request.id),
        ),
        deadline => {
            let outcome = execute(&context, request, &agent, &agent_id, deadline, started).await;
            record_sample(&context, request, &agent_id, &outcome, started);
            outcome
        }
    };

    lease.release();
    context.active().remove(&request.id);
    finish(&context, task, outcome, Some(agent_id));
}

/// Time left before the request's deadline, when deadlines are enforced.
fn remaining_time(context: &OrchestratorContext, request: &TaskRequest) -> Option<Duration> {
    if !context.config.scheduler.enforce_deadlines {
        return None;
    }
    let deadline = request.deadline?;
    Some((deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// Calls the executor with panic isolation and the optional deadline.
async fn execute(
    context: &OrchestratorContext,
    request: &TaskRequest,
    agent: &AgentSnapshot,
    agent_id: &AgentId,
    deadline: Option<Duration>,
    started: Instant,
) -> TaskOutcome {
    let cancel = context.shutdown.child_token();
    let execution =
        AssertUnwindSafe(context.executor.execute(request, agent, cancel.clone())).catch_unwind();

    let result = match deadline {
        Some(limit) => match timeout(limit, execution).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                return TaskOutcome::failed(
                    ErrorKind::DeadlineExceeded,
                    format!("{} exceeded its deadline after {}ms", request.id, elapsed_ms(started)),
                );
            }
        },
        None => execution.await,
    };

    if let Ok(Ok(report)) = &result {
        debug!(
            "{} on {agent_id}: executor reported {}ms",
            request.id, report.duration_ms
        );
    }
    match result {
        Ok(Ok(report)) if report.success => TaskOutcome::Completed {
            agent_id: agent_id.clone(),
            duration_ms: elapsed_ms(started),
        },
        Ok(Ok(report)) => TaskOutcome::failed(ErrorKind::ExecutionFailure, report.detail),
        Ok(Err(error)) if context.shutdown.is_cancelled() => {
            TaskOutcome::failed(ErrorKind::ShutDown, error.to_string())
        }
        Ok(Err(error)) => TaskOutcome::failed(ErrorKind::ExecutionFailure, error.to_string()),
        Err(panic) => TaskOutcome::failed(
            ErrorKind::ExecutionFailure,
            format!("Executor panicked: {}", panic_message(panic.as_ref())),
        ),
    }
}

/// Feeds the profiler and the predictor. Shutdown cancellations say nothing
/// about the agent and are skipped.
fn record_sample(
    context: &OrchestratorContext,
    request: &TaskRequest,
    agent_id: &AgentId,
    outcome: &TaskOutcome,
    started: Instant,
) {
    if matches!(
        outcome,
        TaskOutcome::Failed {
            kind: ErrorKind::ShutDown,
            ..
        }
    ) {
        return;
    }
    let success = outcome.is_success();
    let response_ms = started.elapsed().as_secs_f64() * 1000.0;
    context.profiler.record_metric(agent_id, response_ms, success);
    context.scorer.update_prediction(
        request.task_type,
        agent_id,
        if success { 1.0 } else { 0.0 },
    );
}

/// Emits the terminal event and resolves the waiter. Called exactly once
/// per task.
fn finish(
    context: &OrchestratorContext,
    task: QueuedTask,
    outcome: TaskOutcome,
    agent_id: Option<AgentId>,
) {
    let task_id = task.request.id;
    match &outcome {
        TaskOutcome::Completed {
            agent_id,
            duration_ms,
        } => {
            info!("{task_id} completed on {agent_id} in {duration_ms}ms");
            context
                .events
                .task_completed(task_id, agent_id.clone(), *duration_ms);
        }
        TaskOutcome::Failed { kind, detail } => {
            warn!("{task_id} failed ({kind}): {detail}");
            context
                .events
                .task_failed(task_id, agent_id, *kind, detail.clone());
        }
    }

    if let Some(waiter) = task.waiter {
        if waiter.send(outcome).is_err() {
            debug!("Nobody is waiting on {task_id} any more");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
