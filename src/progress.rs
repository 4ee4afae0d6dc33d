//! Completion percentage over a status-board snapshot.

use crate::state::TaskState;
use std::collections::HashMap;

/// Percentage of tasks that have reached a terminal state.
///
/// Failed tasks count as "done" for progress purposes (the run has
/// nothing further to do with them), not as success. Returns 0 for an
/// empty snapshot. Pure and side-effect free; safe to call at arbitrary
/// rates from the renderer.
pub fn completion_percentage(snapshot: &HashMap<String, TaskState>) -> u8 {
    let total = snapshot.len();
    if total == 0 {
        return 0;
    }
    let done = snapshot
        .values()
        .filter(|state| state.status.is_finished())
        .count();
    ((done * 100) as f64 / total as f64).round() as u8
}
