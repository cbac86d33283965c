//! Integration tests for the driver loop.
//!
//! Policies run against a [`SimulatedJobQueue`] with short real-time
//! intervals.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use crawlctl_core::error::CoreError;
use crawlctl_core::outcome::OutcomeClassifier;
use crawlctl_core::request::JobTemplate;
use crawlctl_core::types::{JobKey, JobOutcome};
use crawlctl_jobq::{JobBehavior, JobQueueError, SimulatedJobQueue};
use crawlctl_manager::{CrawlManager, GeneratorBounded, JsonValues, ManagerError, Periodic, SingleShot};
use crawlctl_worker::runner::{run, LoopConfig, RunEnd};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn queue() -> Arc<SimulatedJobQueue> {
    Arc::new(SimulatedJobQueue::new("3").with_own_job_key(JobKey::new("3/1/1")))
}

fn manager(queue: &Arc<SimulatedJobQueue>) -> CrawlManager {
    CrawlManager::new(
        queue.clone(),
        JobTemplate::new("products"),
        OutcomeClassifier::default(),
    )
}

fn looping(interval_ms: u64) -> LoopConfig {
    LoopConfig {
        interval: Some(Duration::from_millis(interval_ms)),
        max_running_time: None,
    }
}

// ---------------------------------------------------------------------------
// Test: loop modes
// ---------------------------------------------------------------------------

/// Without a loop interval exactly one tick runs, then the policy closes.
#[tokio::test]
async fn single_tick_without_interval() {
    let queue = queue();
    let mut policy = SingleShot::new(manager(&queue));

    let report = run(&mut policy, &LoopConfig::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.ticks, 1);
    assert_eq!(report.end, RunEnd::SingleTick);
    assert_eq!(report.terminal_outcome, Some(JobOutcome::finished()));
    assert_eq!(queue.jobs().await.len(), 1);
}

/// In loop mode the run ends when the policy stops.
#[tokio::test]
async fn loops_until_policy_stops() {
    let queue = queue();
    let mut policy = SingleShot::new(manager(&queue));

    let report = run(&mut policy, &looping(5), CancellationToken::new())
        .await
        .unwrap();

    // Submit, one "still running" poll, then the completion.
    assert_eq!(report.ticks, 3);
    assert_eq!(report.end, RunEnd::Stopped);
    assert_eq!(queue.own_finish().await, Some(JobOutcome::finished()));
}

/// A bad outcome of the supervised job is the run's terminal outcome.
#[tokio::test]
async fn reports_bad_outcome_on_close() {
    let queue = Arc::new(
        SimulatedJobQueue::new("3")
            .with_own_job_key(JobKey::new("3/1/1"))
            .with_default_behavior(JobBehavior::immediate("failed")),
    );
    let mut policy = SingleShot::new(manager(&queue));

    let report = run(&mut policy, &looping(5), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.terminal_outcome, Some(JobOutcome::new("failed")));
    assert_eq!(queue.own_finish().await, Some(JobOutcome::new("failed")));
}

// ---------------------------------------------------------------------------
// Test: early exits
// ---------------------------------------------------------------------------

/// Cancelling during the wait ends the loop and still closes the policy.
#[tokio::test]
async fn cancellation_stops_loop() {
    let queue = queue();
    let mut policy = Periodic::new(manager(&queue));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = run(&mut policy, &looping(10), cancel).await.unwrap();

    assert_eq!(report.end, RunEnd::Cancelled);
    assert!(report.ticks >= 1);
    // Periodic propagates nothing.
    assert_eq!(report.terminal_outcome, None);
    assert_eq!(queue.own_finish().await, None);
}

/// A token cancelled up front runs no tick but still closes.
#[tokio::test]
async fn cancelled_before_first_tick() {
    let queue = queue();
    let mut policy = SingleShot::new(manager(&queue));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run(&mut policy, &looping(10), cancel).await.unwrap();

    assert_eq!(report.ticks, 0);
    assert_eq!(report.end, RunEnd::Cancelled);
    assert!(queue.jobs().await.is_empty());
    assert_eq!(queue.own_finish().await, Some(JobOutcome::finished()));
}

/// The running-time limit ends an endless policy.
#[tokio::test]
async fn max_running_time_stops_loop() {
    let queue = queue();
    let mut policy = Periodic::new(manager(&queue));
    let config = LoopConfig {
        interval: Some(Duration::from_millis(10)),
        max_running_time: Some(Duration::from_millis(40)),
    };

    let report = run(&mut policy, &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.end, RunEnd::TimeLimit);
    assert!(report.ticks >= 1);
}

// ---------------------------------------------------------------------------
// Test: errors
// ---------------------------------------------------------------------------

/// A failed tick is returned after the policy was closed.
#[tokio::test]
async fn tick_error_is_returned_after_close() {
    let queue = queue();
    let source = JsonValues::new(vec![json!({ "page": 1 }), json!(null)]);
    let mut policy = GeneratorBounded::new(manager(&queue), Box::new(source), None);

    let result = run(&mut policy, &looping(5), CancellationToken::new()).await;

    assert_matches!(
        result,
        Err(ManagerError::Core(CoreError::MalformedParameters(_)))
    );
    assert_eq!(queue.own_finish().await, Some(JobOutcome::finished()));
}

/// If resume fails nothing runs and nothing is reported.
#[tokio::test]
async fn resume_error_aborts_run() {
    let queue = queue();
    queue.set_unavailable(Some("maintenance".to_string())).await;
    let mut policy = SingleShot::new(manager(&queue));

    let result = run(&mut policy, &looping(5), CancellationToken::new()).await;

    assert_matches!(
        result,
        Err(ManagerError::JobQueue(JobQueueError::Request(_)))
    );
    assert_eq!(queue.own_finish().await, None);
}
