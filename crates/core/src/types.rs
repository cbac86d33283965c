//! Identifier and value types shared by every crate in the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Parameters of a single job submission (argument name -> value).
pub type ParamMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// JobKey
// ---------------------------------------------------------------------------

/// Opaque identifier of a submitted remote job, e.g. `"123/4/56"`.
///
/// Unique per submission and stable for the lifetime of the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading project segment of the key (everything before the first `/`).
    pub fn project_id(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for JobKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// ---------------------------------------------------------------------------
// JobOutcome
// ---------------------------------------------------------------------------

/// Label reported by the job-queue service when a job finishes
/// (its close reason). Not enumerated here: the set of labels is
/// domain-specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobOutcome(String);

impl JobOutcome {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self(outcome.into())
    }

    /// The default outcome of a run with nothing to report.
    pub fn finished() -> Self {
        Self::new(crate::outcome::FINISHED_OUTCOME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobOutcome {
    fn from(outcome: &str) -> Self {
        Self::new(outcome)
    }
}

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Life-cycle state of a remote job as listed by the job-queue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Finished,
}

impl JobState {
    /// States a job can be in while the manager still has to track it.
    pub const IN_FLIGHT: [JobState; 2] = [JobState::Running, JobState::Pending];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Finished => "finished",
        }
    }
}
