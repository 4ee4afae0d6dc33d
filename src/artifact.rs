//! Artifact probes: the only observable signals from phase actions.
//!
//! Phase actions are opaque external processes; the executor never sees
//! their output directly. Everything it knows about a task's progress is
//! derived from four booleans over the artifact directory: the plan file
//! exists, the plan carries the "fully implemented" marker, the review
//! file exists, the final deliverable exists.
//!
//! The marker rule: a standalone line (not a checklist item) matching
//! `fully implemented: yes` case-insensitively, inspected only within the
//! first [`MARKER_SCAN_LINES`] lines of the plan.

use crate::error::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Plan artifact file name within a task's artifact directory.
pub const PLAN_FILE: &str = "plan.md";
/// Review artifact file name.
pub const REVIEW_FILE: &str = "review.md";
/// Final deliverable file name.
pub const DELIVERABLE_FILE: &str = "deliverable.md";
/// How many leading plan lines are inspected for the marker.
pub const MARKER_SCAN_LINES: usize = 10;

/// Boolean probes over a task's phase artifacts.
///
/// The executor's whole state machine is driven by these four checks, so
/// tests inject a fake implementation and exercise the transition table
/// without disk I/O.
pub trait ArtifactProbes: Send + Sync {
    /// Whether the plan artifact exists.
    fn plan_exists(&self, task: &str) -> Result<bool>;
    /// Whether the plan carries the "fully implemented: yes" marker.
    fn plan_marked_complete(&self, task: &str) -> Result<bool>;
    /// Whether the review artifact exists.
    fn review_exists(&self, task: &str) -> Result<bool>;
    /// Whether the final deliverable exists.
    fn deliverable_exists(&self, task: &str) -> Result<bool>;
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)^\s*fully implemented:\s*yes\s*$").unwrap()
    })
}

fn is_checklist_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("- [") || trimmed.starts_with("* [")
}

/// Whether any standalone line in the first [`MARKER_SCAN_LINES`] lines
/// of `content` is the implementation marker.
pub fn content_marked_complete(content: &str) -> bool {
    content
        .lines()
        .take(MARKER_SCAN_LINES)
        .filter(|line| !is_checklist_line(line))
        .any(|line| marker_regex().is_match(line))
}

/// Disk-backed probes over `<root>/<task>/{plan,review,deliverable}.md`.
pub struct FsArtifacts {
    root: PathBuf,
}

impl FsArtifacts {
    /// Create probes rooted at the given artifact directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The artifact directory for one task.
    pub fn task_dir(&self, task: &str) -> PathBuf {
        self.root.join(task)
    }

    /// Path of the plan artifact for a task.
    pub fn plan_path(&self, task: &str) -> PathBuf {
        self.task_dir(task).join(PLAN_FILE)
    }

    /// Path of the review artifact for a task.
    pub fn review_path(&self, task: &str) -> PathBuf {
        self.task_dir(task).join(REVIEW_FILE)
    }

    /// Path of the final deliverable for a task.
    pub fn deliverable_path(&self, task: &str) -> PathBuf {
        self.task_dir(task).join(DELIVERABLE_FILE)
    }

    /// Root of the artifact tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the artifact directory for a task if missing.
    pub fn ensure_task_dir(&self, task: &str) -> Result<()> {
        fs::create_dir_all(self.task_dir(task))?;
        Ok(())
    }

    fn exists(path: &Path) -> Result<bool> {
        Ok(path.try_exists()?)
    }
}

impl ArtifactProbes for FsArtifacts {
    fn plan_exists(&self, task: &str) -> Result<bool> {
        Self::exists(&self.plan_path(task))
    }

    fn plan_marked_complete(&self, task: &str) -> Result<bool> {
        let path = self.plan_path(task);
        if !Self::exists(&path)? {
            return Ok(false);
        }
        let content = fs::read_to_string(&path)?;
        Ok(content_marked_complete(&content))
    }

    fn review_exists(&self, task: &str) -> Result<bool> {
        Self::exists(&self.review_path(task))
    }

    fn deliverable_exists(&self, task: &str) -> Result<bool> {
        Self::exists(&self.deliverable_path(task))
    }
}
