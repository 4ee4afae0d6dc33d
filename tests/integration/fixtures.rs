//! Test fixtures for integration tests.
//!
//! Provides a scripted agent that plays the external phase actions
//! against a real artifact directory, plus graph/scheduler helpers.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use swell::agent::PhaseRunner;
use swell::artifact::FsArtifacts;
use swell::core::{Task, TaskGraph};
use swell::error::{Error, Result};
use swell::scheduler::{Scheduler, SchedulerConfig};
use swell::state::StatusBoard;

/// Build a graph from `(id, deps)` pairs in order.
pub fn graph_of(specs: &[(&str, &[&str])]) -> TaskGraph {
    TaskGraph::from_tasks(
        specs
            .iter()
            .map(|(id, deps)| Task::new(id, deps.iter().copied())),
    )
}

/// An agent that performs phase actions by writing real artifacts.
///
/// Behaviors are scripted per task: a review or gate can reject once
/// (clearing the plan's completion marker), an implement can refuse to
/// ever complete, and a plan action can fail outright.
pub struct ScriptedAgent {
    artifacts: FsArtifacts,
    reject_first_review: Mutex<HashSet<String>>,
    reject_first_gate: Mutex<HashSet<String>>,
    never_complete: HashSet<String>,
    fail_plan: HashSet<String>,
    calls: Mutex<Vec<(String, &'static str)>>,
}

impl ScriptedAgent {
    pub fn new<P: Into<std::path::PathBuf>>(artifacts_root: P) -> Self {
        Self {
            artifacts: FsArtifacts::new(artifacts_root),
            reject_first_review: Mutex::new(HashSet::new()),
            reject_first_gate: Mutex::new(HashSet::new()),
            never_complete: HashSet::new(),
            fail_plan: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_review_rejection(self, task: &str) -> Self {
        self.reject_first_review
            .lock()
            .unwrap()
            .insert(task.to_string());
        self
    }

    pub fn with_gate_rejection(self, task: &str) -> Self {
        self.reject_first_gate
            .lock()
            .unwrap()
            .insert(task.to_string());
        self
    }

    pub fn with_never_completing(mut self, task: &str) -> Self {
        self.never_complete.insert(task.to_string());
        self
    }

    pub fn with_failing_plan(mut self, task: &str) -> Self {
        self.fail_plan.insert(task.to_string());
        self
    }

    /// Phases invoked for one task, in order.
    pub fn calls_for(&self, task: &str) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == task)
            .map(|(_, phase)| *phase)
            .collect()
    }

    /// Total phase actions invoked across all tasks.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, task: &str, phase: &'static str) {
        self.calls.lock().unwrap().push((task.to_string(), phase));
    }

    fn write_plan(&self, task: &str, implemented: bool) -> Result<()> {
        self.artifacts.ensure_task_dir(task)?;
        let marker = if implemented { "yes" } else { "no" };
        fs::write(
            self.artifacts.plan_path(task),
            format!(
                "# Plan: {}\nfully implemented: {}\n- [{}] do the work\n",
                task,
                marker,
                if implemented { "x" } else { " " }
            ),
        )?;
        Ok(())
    }
}

#[async_trait]
impl PhaseRunner for ScriptedAgent {
    async fn plan(&self, task: &str) -> Result<()> {
        self.record(task, "plan");
        if self.fail_plan.contains(task) {
            return Err(Error::AgentFailed {
                status: 1,
                stderr: "plan action failed".to_string(),
            });
        }
        self.write_plan(task, false)
    }

    async fn implement(&self, task: &str) -> Result<()> {
        self.record(task, "implement");
        if self.never_complete.contains(task) {
            return Ok(());
        }
        self.write_plan(task, true)
    }

    async fn review(&self, task: &str) -> Result<()> {
        self.record(task, "review");
        self.artifacts.ensure_task_dir(task)?;
        fs::write(self.artifacts.review_path(task), "review: approved\n")?;
        if self.reject_first_review.lock().unwrap().remove(task) {
            self.write_plan(task, false)?;
        }
        Ok(())
    }

    async fn gate(&self, task: &str) -> Result<()> {
        self.record(task, "gate");
        if self.reject_first_gate.lock().unwrap().remove(task) {
            // Rejection: no deliverable, and the marker is reset so the
            // loop re-implements instead of spinning.
            self.write_plan(task, false)?;
            return Ok(());
        }
        self.artifacts.ensure_task_dir(task)?;
        fs::write(self.artifacts.deliverable_path(task), "delivered\n")?;
        Ok(())
    }
}

/// Everything one end-to-end run needs, rooted in a temp directory.
pub struct TestRun {
    pub temp_dir: TempDir,
    pub agent: Arc<ScriptedAgent>,
    pub board: Arc<StatusBoard>,
    pub scheduler: Scheduler<FsArtifacts, ScriptedAgent>,
}

impl TestRun {
    pub fn new(graph: TaskGraph, agent: ScriptedAgent, temp_dir: TempDir) -> Self {
        Self::with_config(graph, agent, temp_dir, SchedulerConfig::default())
    }

    pub fn with_config(
        graph: TaskGraph,
        agent: ScriptedAgent,
        temp_dir: TempDir,
        config: SchedulerConfig,
    ) -> Self {
        let agent = Arc::new(agent);
        let probes = Arc::new(FsArtifacts::new(temp_dir.path()));
        let board = Arc::new(StatusBoard::from_graph(&graph));
        let scheduler = Scheduler::new(graph, board.clone(), probes, agent.clone(), config);
        Self {
            temp_dir,
            agent,
            board,
            scheduler,
        }
    }

    pub fn artifacts(&self) -> FsArtifacts {
        FsArtifacts::new(self.temp_dir.path())
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Shorthand: fresh temp dir + default scripted agent for a graph.
pub fn test_run(graph: TaskGraph) -> TestRun {
    let temp_dir = TempDir::new().expect("create temp dir");
    let agent = ScriptedAgent::new(temp_dir.path());
    TestRun::new(graph, agent, temp_dir)
}
