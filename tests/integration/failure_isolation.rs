//! Per-task failure absorption and dependency blocking.

use crate::fixtures::{graph_of, ScriptedAgent, TestRun};
use swell::artifact::ArtifactProbes;
use swell::core::TaskStatus;
use swell::progress::completion_percentage;
use swell::scheduler::SchedulerConfig;
use tempfile::TempDir;

#[tokio::test]
async fn test_failed_task_blocks_dependents_forever() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_failing_plan("a");
    let mut run = TestRun::new(
        graph_of(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]),
        agent,
        temp_dir,
    );

    let report = run.scheduler.run().await;

    assert!(!report.is_success());
    assert_eq!(report.failed, vec!["a"]);
    assert_eq!(report.pending, vec!["b", "c"]);
    assert!(report.completed.is_empty());

    // Dependents were never started: no phase actions, no artifacts.
    assert!(run.agent.calls_for("b").is_empty());
    assert!(run.agent.calls_for("c").is_empty());
    assert!(!run.artifacts().plan_exists("b").unwrap());

    // One of three tasks is terminal: 33%.
    let snapshot = run.board.snapshot();
    assert_eq!(snapshot["b"].status, TaskStatus::Pending);
    assert_eq!(completion_percentage(&snapshot), 33);
}

#[tokio::test]
async fn test_sibling_tasks_survive_a_failure() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_failing_plan("bad");
    let mut run = TestRun::new(
        graph_of(&[("bad", &[]), ("good-1", &[]), ("good-2", &[])]),
        agent,
        temp_dir,
    );

    let report = run.scheduler.run().await;

    assert_eq!(report.failed, vec!["bad"]);
    assert_eq!(report.completed, vec!["good-1", "good-2"]);
    assert!(run.artifacts().deliverable_exists("good-1").unwrap());
    assert!(run.artifacts().deliverable_exists("good-2").unwrap());
}

#[tokio::test]
async fn test_circuit_breaker_fails_task_after_ceiling() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_never_completing("stuck");
    let mut run = TestRun::with_config(
        graph_of(&[("stuck", &[])]),
        agent,
        temp_dir,
        SchedulerConfig {
            max_attempts_per_task: 4,
            ..SchedulerConfig::default()
        },
    );

    let report = run.scheduler.run().await;

    assert_eq!(report.failed, vec!["stuck"]);
    // plan + exactly max_attempts implement passes, nothing else.
    assert_eq!(
        run.agent.calls_for("stuck"),
        vec!["plan", "implement", "implement", "implement", "implement"]
    );

    let snapshot = run.board.snapshot();
    assert_eq!(snapshot["stuck"].status, TaskStatus::Failed);
    assert!(snapshot["stuck"]
        .message
        .as_deref()
        .unwrap()
        .contains("maximum attempts reached for stuck"));
}

#[tokio::test]
async fn test_failure_message_lands_on_the_board() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_failing_plan("a");
    let mut run = TestRun::new(graph_of(&[("a", &[])]), agent, temp_dir);

    run.scheduler.run().await;

    let snapshot = run.board.snapshot();
    assert!(snapshot["a"]
        .message
        .as_deref()
        .unwrap()
        .contains("plan action failed"));
}

#[tokio::test]
async fn test_dangling_dependency_reported_as_pending() {
    let mut run = crate::fixtures::test_run(graph_of(&[("a", &["missing"])]));

    let report = run.scheduler.run().await;

    assert!(report.completed.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.pending, vec!["a"]);
    assert_eq!(run.agent.total_calls(), 0);
}
