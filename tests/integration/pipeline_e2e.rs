//! Full pipeline execution tests against a real artifact directory.

use crate::fixtures::{graph_of, test_run, ScriptedAgent, TestRun};
use swell::artifact::ArtifactProbes;
use swell::core::TaskStatus;
use swell::progress::completion_percentage;
use swell::scheduler::SchedulerConfig;
use tempfile::TempDir;

#[tokio::test]
async fn test_single_task_full_pipeline() {
    let mut run = test_run(graph_of(&[("solo", &[])]));

    let report = run.scheduler.run().await;

    assert!(report.is_success());
    assert_eq!(report.completed, vec!["solo"]);
    assert_eq!(
        run.agent.calls_for("solo"),
        vec!["plan", "implement", "review", "gate"]
    );

    let artifacts = run.artifacts();
    assert!(artifacts.plan_exists("solo").unwrap());
    assert!(artifacts.plan_marked_complete("solo").unwrap());
    assert!(artifacts.review_exists("solo").unwrap());
    assert!(artifacts.deliverable_exists("solo").unwrap());
}

#[tokio::test]
async fn test_dependency_chain_completes_in_order() {
    let mut run = test_run(graph_of(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]));

    let report = run.scheduler.run().await;

    assert!(report.is_success());
    assert_eq!(report.completed, vec!["a", "b", "c"]);
    assert_eq!(completion_percentage(&run.board.snapshot()), 100);
}

#[tokio::test]
async fn test_diamond_two_waves() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path());
    let mut run = TestRun::with_config(
        graph_of(&[("a", &[]), ("b", &["a"]), ("c", &["a"])]),
        agent,
        temp_dir,
        SchedulerConfig {
            max_concurrent: Some(2),
            ..SchedulerConfig::default()
        },
    );

    // Wave 1 can only admit `a`; b and c are not ready yet.
    assert!(run.scheduler.execute_wave().await);
    let snapshot = run.board.snapshot();
    assert_eq!(snapshot["a"].status, TaskStatus::Completed);
    assert_eq!(snapshot["b"].status, TaskStatus::Pending);
    assert_eq!(snapshot["c"].status, TaskStatus::Pending);

    // Wave 2 admits both dependents together (2 <= cap).
    assert!(run.scheduler.execute_wave().await);
    let snapshot = run.board.snapshot();
    assert_eq!(snapshot["b"].status, TaskStatus::Completed);
    assert_eq!(snapshot["c"].status, TaskStatus::Completed);

    // Graph is drained: nothing further to admit.
    assert!(!run.scheduler.execute_wave().await);
    assert_eq!(completion_percentage(&run.board.snapshot()), 100);
}

#[tokio::test]
async fn test_rerun_skips_delivered_tasks() {
    let graph = || graph_of(&[("a", &[]), ("b", &["a"])]);
    let mut first = test_run(graph());
    assert!(first.scheduler.run().await.is_success());

    // A second run over the same artifact directory finds every
    // deliverable in place and invokes no phase action at all.
    let temp_dir = first.temp_dir;
    let agent = ScriptedAgent::new(temp_dir.path());
    let mut second = TestRun::new(graph(), agent, temp_dir);

    let report = second.scheduler.run().await;

    assert!(report.is_success());
    assert_eq!(second.agent.total_calls(), 0);
}

#[tokio::test]
async fn test_rejected_review_forces_reimplementation() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_review_rejection("a");
    let mut run = TestRun::new(graph_of(&[("a", &[])]), agent, temp_dir);

    let report = run.scheduler.run().await;

    assert!(report.is_success());
    assert_eq!(
        run.agent.calls_for("a"),
        vec!["plan", "implement", "review", "implement", "gate"]
    );
    assert!(run.artifacts().deliverable_exists("a").unwrap());
}

#[tokio::test]
async fn test_rejected_gate_forces_reimplementation() {
    let temp_dir = TempDir::new().unwrap();
    let agent = ScriptedAgent::new(temp_dir.path()).with_gate_rejection("a");
    let mut run = TestRun::new(graph_of(&[("a", &[])]), agent, temp_dir);

    let report = run.scheduler.run().await;

    assert!(report.is_success());
    assert_eq!(
        run.agent.calls_for("a"),
        vec!["plan", "implement", "review", "gate", "implement", "gate"]
    );
    assert!(run.artifacts().deliverable_exists("a").unwrap());
}

#[tokio::test]
async fn test_artifact_layout_on_disk() {
    let mut run = test_run(graph_of(&[("layout", &[])]));
    run.scheduler.run().await;

    let task_dir = run.path().join("layout");
    assert!(task_dir.join("plan.md").is_file());
    assert!(task_dir.join("review.md").is_file());
    assert!(task_dir.join("deliverable.md").is_file());
}
