//! Driver loop for a crawl-manager policy.
//!
//! Resumes once, then ticks until the policy stops, the loop interval is
//! disabled, the running-time limit is hit or the cancellation token
//! fires. The policy is always closed at the end.

use std::time::Duration;

use crawlctl_core::config::ManagerConfig;
use crawlctl_core::types::JobOutcome;
use crawlctl_manager::{CrawlPolicy, ManagerError, TickDecision};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Timing of the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopConfig {
    /// Wait between ticks. `None` runs a single tick.
    pub interval: Option<Duration>,
    /// Stop ticking once the run is older than this.
    pub max_running_time: Option<Duration>,
}

impl LoopConfig {
    /// `0` seconds disables either setting.
    pub fn from_config(config: &ManagerConfig) -> Self {
        let secs = |value: u64| (value > 0).then(|| Duration::from_secs(value));
        Self {
            interval: secs(config.loop_interval_secs),
            max_running_time: secs(config.max_running_time_secs),
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The policy reported the run complete.
    Stopped,
    /// Loop mode is off; one tick ran.
    SingleTick,
    TimeLimit,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u64,
    pub end: RunEnd,
    /// Outcome reported on close, if the policy propagates one.
    pub terminal_outcome: Option<JobOutcome>,
}

/// Drive `policy` to completion.
///
/// A failed `resume()` is returned as is. A failed tick ends the loop;
/// the policy is still closed and the tick error is returned.
pub async fn run(
    policy: &mut dyn CrawlPolicy,
    config: &LoopConfig,
    cancel: CancellationToken,
) -> Result<RunReport, ManagerError> {
    let started = Instant::now();

    let resumed = policy.resume().await?;
    tracing::info!(
        policy = policy.name(),
        resumed,
        interval_ms = config.interval.map(|d| d.as_millis() as u64),
        "Crawl manager started",
    );

    let mut ticks = 0;
    let loop_result = drive(policy, config, &cancel, started, &mut ticks).await;
    let close_result = policy.close().await;

    match (loop_result, close_result) {
        (Ok(end), Ok(terminal_outcome)) => {
            tracing::info!(
                policy = policy.name(),
                ticks,
                end = ?end,
                outcome = terminal_outcome.as_ref().map(JobOutcome::as_str),
                "Crawl manager closed",
            );
            Ok(RunReport {
                ticks,
                end,
                terminal_outcome,
            })
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), close_result) => {
            if let Err(close_err) = close_result {
                tracing::error!(error = %close_err, "Close failed after tick error");
            }
            Err(e)
        }
    }
}

async fn drive(
    policy: &mut dyn CrawlPolicy,
    config: &LoopConfig,
    cancel: &CancellationToken,
    started: Instant,
    ticks: &mut u64,
) -> Result<RunEnd, ManagerError> {
    loop {
        if cancel.is_cancelled() {
            return Ok(RunEnd::Cancelled);
        }
        if let Some(limit) = config.max_running_time {
            if started.elapsed() >= limit {
                tracing::info!(
                    limit_secs = limit.as_secs_f64(),
                    "Max running time reached, closing",
                );
                return Ok(RunEnd::TimeLimit);
            }
        }

        let decision = policy.tick().await.map_err(|e| {
            tracing::error!(policy = policy.name(), error = %e, "Tick failed");
            e
        })?;
        *ticks += 1;

        if decision == TickDecision::Stop {
            return Ok(RunEnd::Stopped);
        }
        let Some(interval) = config.interval else {
            return Ok(RunEnd::SingleTick);
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Crawl manager cancelled, closing");
                return Ok(RunEnd::Cancelled);
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
