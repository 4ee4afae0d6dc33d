//! External agent runner for phase actions.
//!
//! Each phase action (plan/implement/review/gate) is an opaque external
//! process: the runner spawns a coding agent in headless mode with a
//! phase-specific prompt and waits for it to exit. The agent communicates
//! back exclusively by writing phase artifacts to disk; the core never
//! parses its output beyond the exit status.

use crate::artifact::FsArtifacts;
use crate::error::{Error, Result};
use crate::executor::Phase;
use crate::swlog_debug;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for one phase action (10 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// The phase-action collaborator boundary.
///
/// Implementations perform one opaque unit of external work per call and
/// signal progress only through the artifact probes. Tests substitute
/// scripted implementations.
#[async_trait]
pub trait PhaseRunner: Send + Sync {
    /// Produce the plan artifact for a task.
    async fn plan(&self, task: &str) -> Result<()>;
    /// Advance the implementation; may flip the plan's completion marker.
    async fn implement(&self, task: &str) -> Result<()>;
    /// Review the implementation; a rejection clears the marker.
    async fn review(&self, task: &str) -> Result<()>;
    /// Run the quality gate; success produces the final deliverable.
    async fn gate(&self, task: &str) -> Result<()>;
}

/// Headless external agent executor.
///
/// Spawns the configured agent binary (`-p <prompt>`) once per phase
/// action, bounded by a timeout. A non-zero exit or a timeout is a
/// phase-action failure and fails the task.
pub struct AgentRunner {
    /// Path to the agent binary.
    binary: PathBuf,
    /// Artifact layout the prompts point the agent at.
    artifacts: FsArtifacts,
    /// Timeout for one phase action.
    timeout: Duration,
}

impl AgentRunner {
    /// Create a runner, locating the agent binary on PATH.
    pub fn new<P: Into<PathBuf>>(
        command: &str,
        artifacts_root: P,
        timeout: Duration,
    ) -> Result<Self> {
        let binary =
            which::which(command).map_err(|_| Error::AgentNotFound(command.to_string()))?;
        Ok(Self::with_binary(binary, artifacts_root, timeout))
    }

    /// Create a runner with an explicit binary path.
    pub fn with_binary<P: Into<PathBuf>>(
        binary: PathBuf,
        artifacts_root: P,
        timeout: Duration,
    ) -> Self {
        Self {
            binary,
            artifacts: FsArtifacts::new(artifacts_root),
            timeout,
        }
    }

    /// Build the phase-specific prompt pointing the agent at the task's
    /// artifact files.
    fn prompt_for(&self, phase: Phase, task: &str) -> String {
        let plan = self.artifacts.plan_path(task);
        let review = self.artifacts.review_path(task);
        let deliverable = self.artifacts.deliverable_path(task);

        match phase {
            Phase::Plan => format!(
                "Plan the task '{task}'. Write the plan to {}. Start the file \
                 with the line 'fully implemented: no' and update it to \
                 'fully implemented: yes' only once every step is done.",
                plan.display()
            ),
            Phase::Implement => format!(
                "Implement the next unfinished steps of task '{task}' following \
                 the plan in {}. When every step is done, set the plan's marker \
                 line to 'fully implemented: yes'.",
                plan.display()
            ),
            Phase::Review => format!(
                "Review the implementation of task '{task}' against the plan in \
                 {}. Write findings to {}. If the work is incomplete, set the \
                 plan's marker line back to 'fully implemented: no'.",
                plan.display(),
                review.display()
            ),
            Phase::Gate => format!(
                "Run the quality gate for task '{task}'. If it passes, write the \
                 final summary to {}. If it fails, remove {} and set the marker \
                 in {} back to 'fully implemented: no'.",
                deliverable.display(),
                review.display(),
                plan.display()
            ),
        }
    }

    async fn run_phase(&self, phase: Phase, task: &str) -> Result<()> {
        self.artifacts.ensure_task_dir(task)?;
        let prompt = self.prompt_for(phase, task);
        swlog_debug!("[{}] spawning agent for {} phase", task, phase);

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary).arg("-p").arg(&prompt).output(),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))??;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::AgentFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl PhaseRunner for AgentRunner {
    async fn plan(&self, task: &str) -> Result<()> {
        self.run_phase(Phase::Plan, task).await
    }

    async fn implement(&self, task: &str) -> Result<()> {
        self.run_phase(Phase::Implement, task).await
    }

    async fn review(&self, task: &str) -> Result<()> {
        self.run_phase(Phase::Review, task).await
    }

    async fn gate(&self, task: &str) -> Result<()> {
        self.run_phase(Phase::Gate, task).await
    }
}
