//! Per-task executor: the multi-phase retry state machine.
//!
//! The executor drives one task through plan → implement → review → gate
//! using only the artifact probes to observe what the opaque phase
//! actions did. The probe-derived state is computed once per loop
//! iteration into an explicit [`StepDecision`] so the transition table
//! stays auditable and testable without disk I/O.
//!
//! Failures are absorbed per task: any phase-action error or circuit
//! breaker trip marks the task failed in both the graph and the status
//! board, then propagates to the wave, which swallows it.

use crate::agent::PhaseRunner;
use crate::artifact::ArtifactProbes;
use crate::core::task::TaskStatus;
use crate::core::TaskGraph;
use crate::error::{Error, Result};
use crate::state::StatusBoard;
use crate::{swlog, swlog_debug, swlog_error};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One of the four ordered phases a task passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Plan,
    Implement,
    Review,
    Gate,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 4] = [Phase::Plan, Phase::Implement, Phase::Review, Phase::Gate];
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Plan => write!(f, "plan"),
            Phase::Implement => write!(f, "implement"),
            Phase::Review => write!(f, "review"),
            Phase::Gate => write!(f, "gate"),
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plan" => Ok(Phase::Plan),
            "implement" => Ok(Phase::Implement),
            "review" => Ok(Phase::Review),
            "gate" | "quality-gate" => Ok(Phase::Gate),
            other => Err(Error::UnknownPhase(other.to_string())),
        }
    }
}

/// Probe-derived decision for one retry-loop iteration.
///
/// Evaluated top to bottom with short-circuit, mirroring the order the
/// probes are consulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepDecision {
    /// Implementation marker is absent; run another implement pass.
    Implement,
    /// Marker present but no review yet; run the review.
    Review,
    /// Gate phase is excluded from this run; stop here.
    Finish,
    /// Reviewed but no deliverable; run the quality gate.
    Gate,
    /// Deliverable already present; nothing left to do.
    AlreadyDelivered,
}

fn decide_step<P: ArtifactProbes>(
    probes: &P,
    task: &str,
    gate_allowed: bool,
) -> Result<StepDecision> {
    if !probes.plan_marked_complete(task)? {
        return Ok(StepDecision::Implement);
    }
    if !probes.review_exists(task)? {
        return Ok(StepDecision::Review);
    }
    if !gate_allowed {
        return Ok(StepDecision::Finish);
    }
    if !probes.deliverable_exists(task)? {
        return Ok(StepDecision::Gate);
    }
    Ok(StepDecision::AlreadyDelivered)
}

/// Drives a single task through its phases.
///
/// One executor instance is shared by all waves of a run; per-task state
/// lives entirely in the graph, the board, and the artifacts.
pub struct TaskExecutor<P, R> {
    graph: Arc<RwLock<TaskGraph>>,
    board: Arc<StatusBoard>,
    probes: Arc<P>,
    runner: Arc<R>,
    /// Restricts which phases execute; `None` means all.
    allowed_phases: Option<HashSet<Phase>>,
    /// Retry ceiling for the implement/review loop.
    max_attempts: usize,
    /// Disables the circuit breaker for manual runs.
    unlimited: bool,
}

impl<P, R> TaskExecutor<P, R>
where
    P: ArtifactProbes,
    R: PhaseRunner,
{
    pub fn new(
        graph: Arc<RwLock<TaskGraph>>,
        board: Arc<StatusBoard>,
        probes: Arc<P>,
        runner: Arc<R>,
        allowed_phases: Option<HashSet<Phase>>,
        max_attempts: usize,
        unlimited: bool,
    ) -> Self {
        Self {
            graph,
            board,
            probes,
            runner,
            allowed_phases,
            max_attempts,
            unlimited,
        }
    }

    fn phase_allowed(&self, phase: Phase) -> bool {
        self.allowed_phases
            .as_ref()
            .map(|set| set.contains(&phase))
            .unwrap_or(true)
    }

    /// Execute one task to completion or failure.
    ///
    /// Always settles the task's status in both the graph and the board
    /// before returning; the error is re-raised so the wave can log it,
    /// but it never escapes the scheduler.
    pub async fn execute(&self, task: &str) -> Result<()> {
        match self.drive(task).await {
            Ok(()) => {
                self.settle(task, TaskStatus::Completed).await;
                swlog!("[{}] completed", task);
                Ok(())
            }
            Err(e) => {
                self.board.update_message(task, Some(&e.to_string()));
                self.settle(task, TaskStatus::Failed).await;
                swlog_error!("[{}] failed: {}", task, e);
                Err(e)
            }
        }
    }

    async fn drive(&self, task: &str) -> Result<()> {
        // Idempotent short-circuit for re-runs.
        if self.probes.deliverable_exists(task)? {
            swlog_debug!("[{}] deliverable already present, skipping", task);
            return Ok(());
        }

        if !self.probes.plan_exists(task)? {
            if !self.phase_allowed(Phase::Plan) {
                return Ok(());
            }
            self.board.update_step(task, Some("planning"));
            self.runner.plan(task).await?;
        }

        if !self.phase_allowed(Phase::Implement) {
            return Ok(());
        }

        let gate_allowed = self.phase_allowed(Phase::Gate);
        let mut attempts = 0usize;
        loop {
            if !self.unlimited && attempts >= self.max_attempts {
                return Err(Error::MaxAttemptsReached {
                    task: task.to_string(),
                    attempts,
                });
            }
            attempts += 1;

            match decide_step(self.probes.as_ref(), task, gate_allowed)? {
                StepDecision::Implement => {
                    self.board
                        .update_step(task, Some(&format!("implementing (attempt {})", attempts)));
                    self.runner.implement(task).await?;
                }
                StepDecision::Review => {
                    self.board.update_step(task, Some("reviewing"));
                    self.runner.review(task).await?;
                }
                StepDecision::Finish => break,
                StepDecision::Gate => {
                    self.board.update_step(task, Some("quality gate"));
                    self.runner.gate(task).await?;
                    // A rejected gate leaves no deliverable (and clears the
                    // marker, forcing another implement pass).
                    if self.probes.deliverable_exists(task)? {
                        break;
                    }
                }
                StepDecision::AlreadyDelivered => break,
            }
        }

        Ok(())
    }

    async fn settle(&self, task: &str, status: TaskStatus) {
        {
            let mut graph = self.graph.write().await;
            if let Some(node) = graph.get_mut(task) {
                match status {
                    TaskStatus::Completed => node.complete(),
                    TaskStatus::Failed => node.fail(),
                    _ => node.status = status,
                }
            }
        }
        self.board.update_status(task, status);
        self.board.update_step(task, None);
    }
}
