//! Integration test suite for swell.
//!
//! These tests exercise the scheduler end to end against a real artifact
//! directory: a scripted agent plays the external phase actions and
//! communicates with the core exclusively by writing plan/review/
//! deliverable files, exactly like a production agent would.
//!
//! # Test Categories
//!
//! - `pipeline_e2e`: full pipeline runs, idempotent re-runs, retry loops
//! - `failure_isolation`: per-task failure absorption and blocked dependents
//! - `partial_runs`: phase-restricted (best-effort) executions
//!
//! # CI Compatibility
//!
//! No external agent binary is spawned; everything runs against temp
//! directories and in-process scripted actions.

mod fixtures;

mod failure_isolation;
mod pipeline_e2e;
