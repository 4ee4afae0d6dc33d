//! Shared live-status store for in-flight runs.
//!
//! The `StatusBoard` multiplexes progress from many concurrently running
//! task executors into a single map the status renderer can snapshot at
//! any rate. It deliberately duplicates each task's status from the graph
//! node so that readers never need the scheduler's locks: all mutations
//! go through a short mutex-guarded critical section, and `snapshot()`
//! returns a fresh clone, never the live structure.
//!
//! Mutations addressed to an unknown task id are logged and ignored; a
//! stale id from a finished run must never take the scheduler down.

use crate::core::task::TaskStatus;
use crate::core::TaskGraph;
use crate::swlog_warn;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Maximum stored length of a progress message, in characters.
pub const MESSAGE_LIMIT: usize = 100;

/// Live state of one task, independent of the graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskState {
    /// Mirrored task status.
    pub status: TaskStatus,
    /// Free-text label for the current phase/attempt.
    pub step: Option<String>,
    /// Last observed progress message, truncated to [`MESSAGE_LIMIT`].
    pub message: Option<String>,
}

impl TaskState {
    fn seeded(status: TaskStatus) -> Self {
        Self {
            status,
            step: None,
            message: None,
        }
    }
}

/// Shared status board, safe to mutate from concurrent executors.
pub struct StatusBoard {
    entries: Mutex<HashMap<String, TaskState>>,
    renderer_active: AtomicBool,
}

impl StatusBoard {
    /// Create a board seeded with the given ids and initial statuses.
    pub fn new<I>(seed: I) -> Self
    where
        I: IntoIterator<Item = (String, TaskStatus)>,
    {
        let entries = seed
            .into_iter()
            .map(|(id, status)| (id, TaskState::seeded(status)))
            .collect();
        Self {
            entries: Mutex::new(entries),
            renderer_active: AtomicBool::new(false),
        }
    }

    /// Create a board mirroring every task in the graph.
    pub fn from_graph(graph: &TaskGraph) -> Self {
        Self::new(graph.tasks().map(|t| (t.id.clone(), t.status)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TaskState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update the mirrored status for a task.
    ///
    /// Unknown ids are logged and ignored.
    pub fn update_status(&self, id: &str, status: TaskStatus) {
        let mut entries = self.lock();
        match entries.get_mut(id) {
            Some(state) => state.status = status,
            None => swlog_warn!("status update for unknown task '{}' ignored", id),
        }
    }

    /// Update the current step label for a task.
    pub fn update_step(&self, id: &str, step: Option<&str>) {
        let mut entries = self.lock();
        match entries.get_mut(id) {
            Some(state) => state.step = step.map(str::to_string),
            None => swlog_warn!("step update for unknown task '{}' ignored", id),
        }
    }

    /// Update the last progress message for a task.
    ///
    /// Empty messages are normalized to `None`; long messages are
    /// truncated to [`MESSAGE_LIMIT`] characters plus an ellipsis.
    pub fn update_message(&self, id: &str, message: Option<&str>) {
        let normalized = message
            .filter(|m| !m.is_empty())
            .map(truncate_message);

        let mut entries = self.lock();
        match entries.get_mut(id) {
            Some(state) => state.message = normalized,
            None => swlog_warn!("message update for unknown task '{}' ignored", id),
        }
    }

    /// Return a fresh copy of the whole board.
    ///
    /// O(n) allocation, no lock is held by the caller afterwards, so the
    /// renderer can never observe a map mid-mutation or mutate scheduler
    /// state through the result.
    pub fn snapshot(&self) -> HashMap<String, TaskState> {
        self.lock().clone()
    }

    /// Mark the live renderer as owning (or releasing) the terminal.
    pub fn set_active(&self, active: bool) {
        self.renderer_active.store(active, Ordering::SeqCst);
    }

    /// Whether the live renderer currently owns the terminal.
    pub fn is_active(&self) -> bool {
        self.renderer_active.load(Ordering::Relaxed)
    }
}

fn truncate_message(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MESSAGE_LIMIT).collect();
    if chars.next().is_none() {
        head
    } else {
        let mut truncated = head;
        truncated.push('…');
        truncated
    }
}
