//! Observer capability injected into the crawl manager.
//!
//! The manager reports its domain events (resumed jobs, submissions,
//! status observations, the final outcome) to a [`ManagerObserver`]
//! instead of logging them itself. [`TracingObserver`] is the default
//! and turns each event into a `tracing` record.

use crawlctl_core::outcome::OutcomeClass;
use crawlctl_core::request::JobRequest;
use crawlctl_core::types::{JobKey, JobOutcome};
use crawlctl_jobq::SelfFinish;

/// Receives the crawl manager's domain events. Every hook defaults to a
/// no-op.
pub trait ManagerObserver: Send + Sync {
    /// An in-flight job was picked up by `resume()`.
    fn job_resumed(&self, _key: &JobKey) {}

    fn job_submitted(&self, _key: &JobKey, _request: &JobRequest) {}

    /// The service rejected a submission as a duplicate; nothing is tracked.
    fn duplicate_submission(&self, _request: &JobRequest, _reason: &str) {}

    /// A status query found the job unfinished; the pass stops here.
    fn job_still_running(&self, _key: &JobKey) {}

    fn job_finished(&self, _key: &JobKey, _outcome: &JobOutcome, _class: OutcomeClass) {}

    /// The parameter source of a generator run ran dry.
    fn parameters_exhausted(&self, _pulled: u64, _outstanding: usize) {}

    fn own_job_finished(&self, _outcome: &JobOutcome, _result: &SelfFinish) {}
}

/// Logs every manager event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ManagerObserver for TracingObserver {
    fn job_resumed(&self, key: &JobKey) {
        tracing::info!(job_key = %key, "Added running job");
    }

    fn job_submitted(&self, key: &JobKey, request: &JobRequest) {
        tracing::info!(
            job_key = %key,
            job_type = %request.job_type,
            units = ?request.units,
            "Scheduled job",
        );
        tracing::debug!(job_key = %key, params = ?request.params, tags = ?request.tags);
    }

    fn duplicate_submission(&self, request: &JobRequest, reason: &str) {
        tracing::error!(job_type = %request.job_type, reason, "Duplicate submission skipped");
    }

    fn job_still_running(&self, key: &JobKey) {
        tracing::info!(job_key = %key, "Job still running");
    }

    fn job_finished(&self, key: &JobKey, outcome: &JobOutcome, class: OutcomeClass) {
        match class {
            OutcomeClass::Good => {
                tracing::info!(job_key = %key, outcome = %outcome, "Job finished");
            }
            OutcomeClass::Bad => {
                tracing::warn!(job_key = %key, outcome = %outcome, "Job finished with bad outcome");
            }
        }
    }

    fn parameters_exhausted(&self, pulled: u64, outstanding: usize) {
        tracing::info!(pulled, outstanding, "Parameter source exhausted");
    }

    fn own_job_finished(&self, outcome: &JobOutcome, result: &SelfFinish) {
        match result {
            SelfFinish::Reported(own_key) => {
                tracing::info!(own_job_key = %own_key, outcome = %outcome, "Manager job finished");
            }
            SelfFinish::Unsupervised => {
                tracing::warn!(
                    outcome = %outcome,
                    "Own job key not set: not running under the job queue",
                );
            }
        }
    }
}
