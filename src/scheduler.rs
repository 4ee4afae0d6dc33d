//! Wave scheduler for parallel task execution.
//!
//! The scheduler repeatedly computes which tasks are ready (pending with
//! all dependencies completed), admits up to the concurrency cap in graph
//! order, and launches a per-task executor for each admitted task. A wave
//! settles fully — success or failure, no sibling cancellation — before
//! the next readiness pass. Failures are absorbed per task: a failed
//! task's dependents simply never become ready, and `run` itself never
//! errors; callers inspect the returned [`RunReport`].

use crate::agent::PhaseRunner;
use crate::artifact::ArtifactProbes;
use crate::core::task::TaskStatus;
use crate::core::TaskGraph;
use crate::error::Result;
use crate::executor::{Phase, TaskExecutor};
use crate::state::StatusBoard;
use crate::{swlog, swlog_debug, swlog_error};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

/// Default retry ceiling for the per-task implement/review loop.
pub const DEFAULT_MAX_ATTEMPTS: usize = 20;

/// Admission cap derived from the host: twice the core count, clamped to
/// [1, 5].
pub fn default_max_concurrent() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 2).clamp(1, 5)
}

/// Construction-time knobs for one scheduling run.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Restricts which phases execute (partial re-runs); `None` = all.
    pub allowed_phases: Option<HashSet<Phase>>,
    /// Admission cap; `None` derives it from the host core count.
    pub max_concurrent: Option<usize>,
    /// Disables the attempts circuit breaker (manual/interactive runs).
    pub unlimited: bool,
    /// Retry ceiling for the per-task implement/review loop.
    pub max_attempts_per_task: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            allowed_phases: None,
            max_concurrent: None,
            unlimited: false,
            max_attempts_per_task: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Outcome of a scheduling run.
///
/// `pending` holds tasks that never became ready — almost always the
/// transitive dependents of a failed task.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub pending: Vec<String>,
}

impl RunReport {
    /// Whether every task in the graph completed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }

    /// Total number of tasks accounted for.
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len() + self.pending.len()
    }
}

/// Wave scheduler driving a task graph to drainage.
pub struct Scheduler<P, R> {
    graph: Arc<RwLock<TaskGraph>>,
    board: Arc<StatusBoard>,
    executor: Arc<TaskExecutor<P, R>>,
    /// Ids currently admitted and not yet settled.
    running: HashSet<String>,
    /// In-flight executors for the current wave.
    in_flight: JoinSet<(String, Result<()>)>,
    max_concurrent: usize,
}

impl<P, R> Scheduler<P, R>
where
    P: ArtifactProbes + 'static,
    R: PhaseRunner + 'static,
{
    /// Create a scheduler over the given graph.
    ///
    /// The status board is passed in (not created here) so the caller can
    /// hand the same board to the live observer.
    pub fn new(
        graph: TaskGraph,
        board: Arc<StatusBoard>,
        probes: Arc<P>,
        runner: Arc<R>,
        config: SchedulerConfig,
    ) -> Self {
        let max_concurrent = config
            .max_concurrent
            .unwrap_or_else(default_max_concurrent)
            .max(1);
        let graph = Arc::new(RwLock::new(graph));
        let executor = Arc::new(TaskExecutor::new(
            graph.clone(),
            board.clone(),
            probes,
            runner,
            config.allowed_phases,
            config.max_attempts_per_task,
            config.unlimited,
        ));
        Self {
            graph,
            board,
            executor,
            running: HashSet::new(),
            in_flight: JoinSet::new(),
            max_concurrent,
        }
    }

    /// The status board mirroring this run.
    pub fn board(&self) -> Arc<StatusBoard> {
        self.board.clone()
    }

    /// Number of tasks currently admitted and unsettled.
    pub fn active_count(&self) -> usize {
        self.running.len()
    }

    /// Ready tasks in graph order.
    pub async fn ready_tasks(&self) -> Vec<String> {
        self.graph.read().await.ready_tasks()
    }

    /// Admit one wave of ready tasks and wait for it to settle.
    ///
    /// Admits the first `min(|ready|, max_concurrent - |running|)` ready
    /// tasks in graph order, launches their executors concurrently, and
    /// waits for every launched executor to finish — a failure in one
    /// never cancels its siblings. Returns whether at least one task was
    /// admitted.
    pub async fn execute_wave(&mut self) -> bool {
        let ready = self.ready_tasks().await;
        let available = self.max_concurrent.saturating_sub(self.running.len());
        let admitted: Vec<String> = ready.into_iter().take(available).collect();

        if admitted.is_empty() {
            return false;
        }
        swlog_debug!(
            "wave: admitting [{}] ({} slots free)",
            admitted.join(", "),
            available
        );

        for id in admitted {
            {
                let mut graph = self.graph.write().await;
                if let Some(task) = graph.get_mut(&id) {
                    task.start();
                }
            }
            self.board.update_status(&id, TaskStatus::Running);
            self.running.insert(id.clone());

            let executor = self.executor.clone();
            self.in_flight.spawn(async move {
                let result = executor.execute(&id).await;
                (id, result)
            });
        }

        // Wave barrier: all launched executors settle before the next
        // readiness pass.
        while let Some(joined) = self.in_flight.join_next().await {
            self.settle(joined);
        }

        true
    }

    fn settle(
        &mut self,
        joined: std::result::Result<(String, Result<()>), tokio::task::JoinError>,
    ) {
        match joined {
            Ok((id, result)) => {
                self.running.remove(&id);
                // The executor already settled both status mirrors; the
                // error was its to report.
                if let Err(e) = result {
                    swlog_debug!("[{}] absorbed failure: {}", id, e);
                }
            }
            Err(e) => {
                swlog_error!("executor task join error: {}", e);
            }
        }
    }

    /// Drive the graph until it drains.
    ///
    /// Never fails; per-task failures and permanently-blocked tasks are
    /// reported through the returned [`RunReport`] and the log.
    pub async fn run(&mut self) -> RunReport {
        loop {
            let admitted = self.execute_wave().await;
            if admitted {
                continue;
            }
            if self.running.is_empty() {
                break;
            }
            // Nothing admissible but executors still in flight: wait for
            // one to settle instead of polling on a timer.
            match self.in_flight.join_next().await {
                Some(joined) => self.settle(joined),
                None => break,
            }
        }
        self.report().await
    }

    /// Build the final report and log the run summary.
    async fn report(&self) -> RunReport {
        let graph = self.graph.read().await;
        let report = RunReport {
            completed: graph.ids_with_status(TaskStatus::Completed),
            failed: graph.ids_with_status(TaskStatus::Failed),
            pending: graph.ids_with_status(TaskStatus::Pending),
        };

        if !report.failed.is_empty() {
            swlog_error!("failed tasks: {}", report.failed.join(", "));
        }
        for id in &report.pending {
            let blocked_on: Vec<String> = graph
                .get(id)
                .map(|t| {
                    t.depends_on
                        .iter()
                        .filter(|dep| {
                            graph
                                .get(dep.as_str())
                                .map(|d| d.status != TaskStatus::Completed)
                                .unwrap_or(true)
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            swlog!(
                "[{}] never became ready (waiting on: {})",
                id,
                blocked_on.join(", ")
            );
        }
        swlog!(
            "run finished: {}/{} tasks completed",
            report.completed.len(),
            graph.len()
        );

        report
    }
}
