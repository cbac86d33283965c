//! In-process job queue used for local dry runs and tests.
//!
//! [`SimulatedJobQueue`] keeps its jobs in memory. Every job reports
//! "not finished" for a fixed number of status polls and then finishes
//! with a fixed outcome, both taken from a [`JobBehavior`]. Behaviors can
//! be scripted per submission, jobs can be seeded to look like leftovers
//! of a previous manager process, and every status query is recorded so
//! callers can check how many remote calls a pass made.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use crawlctl_core::request::{flow_tag, JobRequest};
use crawlctl_core::types::{JobKey, JobOutcome, JobState, Timestamp};
use tokio::sync::Mutex;

use crate::client::{JobQueueClient, JobQueueError, OwnedJobsFilter, SelfFinish};

// ---------------------------------------------------------------------------
// JobBehavior
// ---------------------------------------------------------------------------

/// How a simulated job progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBehavior {
    /// Status polls answered with "not finished" before the job finishes.
    pub polls_until_finished: u32,
    pub outcome: JobOutcome,
}

impl JobBehavior {
    pub fn new(polls_until_finished: u32, outcome: impl Into<String>) -> Self {
        Self {
            polls_until_finished,
            outcome: JobOutcome::new(outcome),
        }
    }

    /// Finishes on the first status poll.
    pub fn immediate(outcome: impl Into<String>) -> Self {
        Self::new(0, outcome)
    }
}

impl Default for JobBehavior {
    fn default() -> Self {
        Self::new(1, crawlctl_core::outcome::FINISHED_OUTCOME)
    }
}

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// Snapshot of a simulated job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub key: JobKey,
    pub request: JobRequest,
    pub state: JobState,
    pub outcome: Option<JobOutcome>,
    pub submitted_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// SimulatedJobQueue
// ---------------------------------------------------------------------------

struct SimJob {
    record: JobRecord,
    behavior: JobBehavior,
    polls: u32,
}

impl SimJob {
    fn finish(&mut self) -> JobOutcome {
        let outcome = self.behavior.outcome.clone();
        self.record.state = JobState::Finished;
        self.record.outcome = Some(outcome.clone());
        self.record.finished_at = Some(Utc::now());
        outcome
    }
}

struct SimState {
    project_id: String,
    job_type_ids: HashMap<String, usize>,
    job_counters: HashMap<String, u64>,
    jobs: Vec<SimJob>,
    default_behavior: JobBehavior,
    scripted: VecDeque<JobBehavior>,
    own_job_key: Option<JobKey>,
    own_finish: Option<JobOutcome>,
    status_queries: Vec<JobKey>,
    unavailable: Option<String>,
}

impl SimState {
    fn next_key(&mut self, job_type: &str) -> JobKey {
        let next_type_id = self.job_type_ids.len() + 1;
        let type_id = *self
            .job_type_ids
            .entry(job_type.to_string())
            .or_insert(next_type_id);
        let counter = self.job_counters.entry(job_type.to_string()).or_insert(0);
        *counter += 1;
        JobKey::new(format!("{}/{}/{}", self.project_id, type_id, counter))
    }

    fn check_available(&self) -> Result<(), JobQueueError> {
        match &self.unavailable {
            Some(reason) => Err(JobQueueError::Request(reason.clone())),
            None => Ok(()),
        }
    }

    fn insert(&mut self, request: JobRequest, state: JobState, behavior: JobBehavior) -> JobKey {
        let key = self.next_key(&request.job_type);
        self.jobs.push(SimJob {
            record: JobRecord {
                key: key.clone(),
                request,
                state,
                outcome: None,
                submitted_at: Utc::now(),
                finished_at: None,
            },
            behavior,
            polls: 0,
        });
        key
    }
}

/// In-memory [`JobQueueClient`].
pub struct SimulatedJobQueue {
    state: Mutex<SimState>,
}

impl SimulatedJobQueue {
    /// Create an empty queue whose job keys start with `project_id`.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(SimState {
                project_id: project_id.into(),
                job_type_ids: HashMap::new(),
                job_counters: HashMap::new(),
                jobs: Vec::new(),
                default_behavior: JobBehavior::default(),
                scripted: VecDeque::new(),
                own_job_key: None,
                own_finish: None,
                status_queries: Vec::new(),
                unavailable: None,
            }),
        }
    }

    /// Behavior of submissions that have no scripted behavior.
    pub fn with_default_behavior(mut self, behavior: JobBehavior) -> Self {
        self.state.get_mut().default_behavior = behavior;
        self
    }

    /// Pretend the manager runs as job `key` of this queue.
    pub fn with_own_job_key(mut self, key: JobKey) -> Self {
        self.state.get_mut().own_job_key = Some(key);
        self
    }

    /// Queue a behavior for the next submission (FIFO).
    pub async fn script(&self, behavior: JobBehavior) {
        self.state.lock().await.scripted.push_back(behavior);
    }

    /// Add a job directly, as if submitted by an earlier process.
    pub async fn seed(&self, request: JobRequest, state: JobState, behavior: JobBehavior) -> JobKey {
        self.state.lock().await.insert(request, state, behavior)
    }

    /// Make every call fail with [`JobQueueError::Request`] while set.
    pub async fn set_unavailable(&self, reason: Option<String>) {
        self.state.lock().await.unavailable = reason;
    }

    pub async fn jobs(&self) -> Vec<JobRecord> {
        let state = self.state.lock().await;
        state.jobs.iter().map(|job| job.record.clone()).collect()
    }

    pub async fn job(&self, key: &JobKey) -> Option<JobRecord> {
        let state = self.state.lock().await;
        state
            .jobs
            .iter()
            .find(|job| &job.record.key == key)
            .map(|job| job.record.clone())
    }

    /// Jobs not finished yet.
    pub async fn in_flight_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .jobs
            .iter()
            .filter(|job| job.record.state != JobState::Finished)
            .count()
    }

    /// Keys passed to [`JobQueueClient::status`], in call order.
    pub async fn status_queries(&self) -> Vec<JobKey> {
        self.state.lock().await.status_queries.clone()
    }

    pub async fn clear_status_queries(&self) {
        self.state.lock().await.status_queries.clear();
    }

    /// Outcome passed to the last successful [`JobQueueClient::finish_self`].
    pub async fn own_finish(&self) -> Option<JobOutcome> {
        self.state.lock().await.own_finish.clone()
    }

    /// Finish a job right away, regardless of its behavior.
    pub async fn force_finish(&self, key: &JobKey, outcome: JobOutcome) -> Result<(), JobQueueError> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|job| &job.record.key == key)
            .ok_or_else(|| JobQueueError::JobNotFound(key.clone()))?;
        job.behavior.outcome = outcome;
        job.finish();
        Ok(())
    }
}

#[async_trait]
impl JobQueueClient for SimulatedJobQueue {
    async fn submit(&self, request: &JobRequest) -> Result<JobKey, JobQueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        let duplicate = state.jobs.iter().any(|job| {
            job.record.state != JobState::Finished
                && job.record.request.job_type == request.job_type
                && job.record.request.params == request.params
        });
        if duplicate {
            return Err(JobQueueError::DuplicateSubmission(format!(
                "job type {} with identical parameters is already queued",
                request.job_type
            )));
        }

        let behavior = state
            .scripted
            .pop_front()
            .unwrap_or_else(|| state.default_behavior.clone());
        let key = state.insert(request.clone(), JobState::Pending, behavior);
        tracing::debug!(job_key = %key, job_type = %request.job_type, "Simulated job submitted");
        Ok(key)
    }

    async fn status(&self, key: &JobKey) -> Result<Option<JobOutcome>, JobQueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.status_queries.push(key.clone());

        let job = state
            .jobs
            .iter_mut()
            .find(|job| &job.record.key == key)
            .ok_or_else(|| JobQueueError::JobNotFound(key.clone()))?;

        if job.record.state == JobState::Finished {
            return Ok(job.record.outcome.clone());
        }
        if job.polls >= job.behavior.polls_until_finished {
            return Ok(Some(job.finish()));
        }
        job.polls += 1;
        job.record.state = JobState::Running;
        Ok(None)
    }

    async fn list_owned(&self, filter: &OwnedJobsFilter) -> Result<Vec<JobKey>, JobQueueError> {
        let state = self.state.lock().await;
        state.check_available()?;

        let tag = filter.flow_id.as_deref().map(flow_tag);
        Ok(state
            .jobs
            .iter()
            .map(|job| &job.record)
            .filter(|record| record.request.job_type == filter.job_type)
            .filter(|record| filter.states.contains(&record.state))
            .filter(|record| match &tag {
                Some(tag) => record
                    .request
                    .tags
                    .as_ref()
                    .is_some_and(|tags| tags.contains(tag)),
                None => true,
            })
            .map(|record| record.key.clone())
            .collect())
    }

    async fn finish_self(&self, outcome: &JobOutcome) -> Result<SelfFinish, JobQueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        match state.own_job_key.clone() {
            Some(key) => {
                state.own_finish = Some(outcome.clone());
                Ok(SelfFinish::Reported(key))
            }
            None => Ok(SelfFinish::Unsupervised),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crawlctl_core::request::JobTemplate;

    use super::*;

    fn request(job_type: &str, page: u64) -> JobRequest {
        let mut params = serde_json::Map::new();
        params.insert("page".to_string(), page.into());
        JobTemplate::new(job_type).build(None, Some(&params))
    }

    #[tokio::test]
    async fn keys_are_sequential_per_job_type() {
        let queue = SimulatedJobQueue::new("77");
        let a1 = queue.submit(&request("a", 1)).await.unwrap();
        let b1 = queue.submit(&request("b", 1)).await.unwrap();
        let a2 = queue.submit(&request("a", 2)).await.unwrap();
        assert_eq!(a1.as_str(), "77/1/1");
        assert_eq!(b1.as_str(), "77/2/1");
        assert_eq!(a2.as_str(), "77/1/2");
    }

    #[tokio::test]
    async fn job_finishes_after_configured_polls() {
        let queue = SimulatedJobQueue::new("1").with_default_behavior(JobBehavior::new(2, "banned"));
        let key = queue.submit(&request("a", 1)).await.unwrap();

        assert_eq!(queue.status(&key).await.unwrap(), None);
        assert_eq!(queue.status(&key).await.unwrap(), None);
        assert_eq!(
            queue.status(&key).await.unwrap(),
            Some(JobOutcome::new("banned"))
        );
        // Stays finished.
        assert_eq!(
            queue.status(&key).await.unwrap(),
            Some(JobOutcome::new("banned"))
        );
        assert_eq!(queue.status_queries().await.len(), 4);
    }

    #[tokio::test]
    async fn scripted_behaviors_apply_in_order() {
        let queue = SimulatedJobQueue::new("1");
        queue.script(JobBehavior::immediate("failed")).await;
        let first = queue.submit(&request("a", 1)).await.unwrap();
        let second = queue.submit(&request("a", 2)).await.unwrap();

        assert_eq!(
            queue.status(&first).await.unwrap(),
            Some(JobOutcome::new("failed"))
        );
        // Default behavior: one "not finished" poll.
        assert_eq!(queue.status(&second).await.unwrap(), None);
    }

    #[tokio::test]
    async fn identical_unfinished_submission_is_duplicate() {
        let queue = SimulatedJobQueue::new("1");
        queue.submit(&request("a", 1)).await.unwrap();
        assert_matches!(
            queue.submit(&request("a", 1)).await,
            Err(JobQueueError::DuplicateSubmission(_))
        );
    }

    #[tokio::test]
    async fn resubmission_after_finish_is_accepted() {
        let queue = SimulatedJobQueue::new("1").with_default_behavior(JobBehavior::immediate("finished"));
        let key = queue.submit(&request("a", 1)).await.unwrap();
        queue.status(&key).await.unwrap();
        assert!(queue.submit(&request("a", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn list_owned_filters_by_type_state_and_flow() {
        let queue = SimulatedJobQueue::new("1");
        let in_flow = JobTemplate::new("a").with_flow_id("f1");
        let other_flow = JobTemplate::new("a").with_flow_id("f2");

        let running = queue
            .seed(in_flow.build(None, None), JobState::Running, JobBehavior::default())
            .await;
        let mut params = serde_json::Map::new();
        params.insert("page".to_string(), 2.into());
        let pending = queue
            .seed(in_flow.build(None, Some(&params)), JobState::Pending, JobBehavior::default())
            .await;
        queue
            .seed(in_flow.build(None, None), JobState::Finished, JobBehavior::default())
            .await;
        queue
            .seed(other_flow.build(None, None), JobState::Running, JobBehavior::default())
            .await;
        queue
            .seed(in_flow.build(Some("b".into()), None), JobState::Running, JobBehavior::default())
            .await;

        let owned = queue
            .list_owned(&OwnedJobsFilter::in_flight("a", Some("f1".to_string())))
            .await
            .unwrap();
        assert_eq!(owned, vec![running, pending]);
    }

    #[tokio::test]
    async fn finish_self_without_own_key_is_unsupervised() {
        let queue = SimulatedJobQueue::new("1");
        let result = queue.finish_self(&JobOutcome::finished()).await.unwrap();
        assert_eq!(result, SelfFinish::Unsupervised);
        assert_eq!(queue.own_finish().await, None);
    }

    #[tokio::test]
    async fn finish_self_records_outcome() {
        let queue = SimulatedJobQueue::new("1").with_own_job_key(JobKey::new("1/9/9"));
        let result = queue.finish_self(&JobOutcome::new("banned")).await.unwrap();
        assert_eq!(result, SelfFinish::Reported(JobKey::new("1/9/9")));
        assert_eq!(queue.own_finish().await, Some(JobOutcome::new("banned")));
    }

    #[tokio::test]
    async fn unavailable_queue_fails_requests() {
        let queue = SimulatedJobQueue::new("1");
        queue.set_unavailable(Some("connection reset".to_string())).await;
        assert_matches!(
            queue.submit(&request("a", 1)).await,
            Err(JobQueueError::Request(_))
        );
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let queue = SimulatedJobQueue::new("1");
        assert_matches!(
            queue.status(&JobKey::new("1/1/1")).await,
            Err(JobQueueError::JobNotFound(_))
        );
    }
}
