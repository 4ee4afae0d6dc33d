//! Task manifest loading.
//!
//! Graph construction from project sources is an external concern; the
//! scheduler accepts a declarative TOML manifest listing tasks and their
//! dependencies in execution-priority (file) order:
//!
//! ```toml
//! [[task]]
//! id = "core"
//!
//! [[task]]
//! id = "api"
//! depends_on = ["core"]
//! ```
//!
//! The manifest is trusted for shape: dependency ids are not checked for
//! existence or acyclicity here (an unresolvable dependency leaves its
//! task permanently unready at run time), and a duplicate id keeps the
//! first occurrence.

use crate::core::{Task, TaskGraph, TaskStatus};
use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A parsed task manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskEntry>,
}

/// One task declaration.
#[derive(Debug, Deserialize)]
pub struct TaskEntry {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Initial status; the builder may mark a task completed up front
    /// when its artifacts already indicate completion.
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl Manifest {
    /// Parse a manifest from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Build the task graph, preserving manifest order.
    pub fn into_graph(self) -> TaskGraph {
        TaskGraph::from_tasks(self.tasks.into_iter().map(|entry| {
            Task::with_status(
                &entry.id,
                entry.depends_on,
                entry.status.unwrap_or(TaskStatus::Pending),
            )
        }))
    }
}

/// Load a manifest file straight into a graph.
pub fn load_graph(path: &Path) -> Result<TaskGraph> {
    Ok(Manifest::load(path)?.into_graph())
}
