//! Job-queue client contract.
//!
//! [`JobQueueClient`] is everything the crawl manager needs from the
//! remote job-queue service: submit a job, read a job's status, list the
//! jobs a run owns, and report the manager's own terminal outcome.
//! Transient transport failures are the implementation's business to
//! retry; whatever error it finally returns aborts the current tick.

use async_trait::async_trait;
use crawlctl_core::request::JobRequest;
use crawlctl_core::types::{JobKey, JobOutcome, JobState};

/// Ownership filter used when listing jobs on resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedJobsFilter {
    pub job_type: String,
    /// Restrict to jobs tagged `FLOW_ID=<flow_id>`.
    pub flow_id: Option<String>,
    pub states: Vec<JobState>,
}

impl OwnedJobsFilter {
    /// Running or pending jobs of `job_type` within `flow_id`.
    pub fn in_flight(job_type: impl Into<String>, flow_id: Option<String>) -> Self {
        Self {
            job_type: job_type.into(),
            flow_id,
            states: JobState::IN_FLIGHT.to_vec(),
        }
    }
}

/// Result of reporting the manager's own terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfFinish {
    /// The outcome was reported for the manager's own job.
    Reported(JobKey),
    /// The manager is not running as a job of the service (local or
    /// manual invocation); nothing was reported.
    Unsupervised,
}

/// Remote job-queue operations consumed by the crawl manager.
#[async_trait]
pub trait JobQueueClient: Send + Sync {
    /// Submit a job. Fails with [`JobQueueError::DuplicateSubmission`]
    /// when an identical job is already queued or running.
    async fn submit(&self, request: &JobRequest) -> Result<JobKey, JobQueueError>;

    /// `Ok(None)` while the job is pending or running; its outcome once
    /// finished.
    async fn status(&self, key: &JobKey) -> Result<Option<JobOutcome>, JobQueueError>;

    /// Keys of the jobs matching `filter`.
    async fn list_owned(&self, filter: &OwnedJobsFilter) -> Result<Vec<JobKey>, JobQueueError>;

    /// Finish the manager's own job with `outcome`.
    async fn finish_self(&self, outcome: &JobOutcome) -> Result<SelfFinish, JobQueueError>;
}

/// Errors from the job-queue layer.
#[derive(Debug, thiserror::Error)]
pub enum JobQueueError {
    /// An identical job is already queued or running.
    #[error("Duplicate submission: {0}")]
    DuplicateSubmission(String),

    /// The service has no job with this key.
    #[error("Job not found: {0}")]
    JobNotFound(JobKey),

    /// The call failed after the client gave up retrying.
    #[error("Job queue request failed: {0}")]
    Request(String),
}
