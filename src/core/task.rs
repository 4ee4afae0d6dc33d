//! Task data model for the execution graph.
//!
//! Tasks are the atomic units of work driven through the phase pipeline.
//! Each task tracks its declared dependencies, status, and timing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status in its lifecycle.
///
/// Tasks progress through these states as they are admitted, executed,
/// and finished by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created but not yet admitted for execution.
    Pending,
    /// Task is currently being driven through its phases.
    Running,
    /// Task completed successfully (final deliverable produced).
    Completed,
    /// Task failed; its dependents will never become ready.
    Failed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

impl TaskStatus {
    /// Check if this status is terminal (Completed or Failed).
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A single task in the execution graph.
///
/// Ids are caller-supplied strings, unique within one graph. Dependencies
/// are declared by id; ids that never resolve to a graph node keep the
/// task permanently unready rather than producing an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task within the graph.
    pub id: String,
    /// Ids of tasks that must complete before this one can start.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Current execution status.
    #[serde(default)]
    pub status: TaskStatus,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was admitted for execution.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task finished (success or failure).
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task with the given id and dependencies.
    pub fn new<I, S>(id: &str, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.to_string(),
            depends_on: depends_on.into_iter().map(Into::into).collect(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Create a task with an externally supplied initial status.
    ///
    /// The graph builder may mark a task completed up front when its
    /// artifacts already indicate completion.
    pub fn with_status<I, S>(id: &str, depends_on: I, status: TaskStatus) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut task = Self::new(id, depends_on);
        task.status = status;
        task
    }

    /// Admit the task for execution.
    ///
    /// Transitions status to Running and records the start time.
    pub fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the task as successfully completed.
    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the task as failed.
    pub fn fail(&mut self) {
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Check if the task is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}
