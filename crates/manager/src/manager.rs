//! Shared crawl-manager state and the operations every policy builds on.
//!
//! [`CrawlManager`] owns the registry of in-flight jobs and the result
//! aggregator. Nothing outside this type mutates either. Policies drive
//! it through four operations:
//!
//! 1. [`resume`](CrawlManager::resume) rebuilds the registry from the
//!    job queue after a (re)start.
//! 2. [`check_running_jobs`](CrawlManager::check_running_jobs) is the
//!    status-check pass run by every tick.
//! 3. [`submit`](CrawlManager::submit) schedules a new job.
//! 4. [`finish_own_job`](CrawlManager::finish_own_job) reports the run's
//!    terminal outcome on close.

use std::collections::BTreeMap;
use std::sync::Arc;

use crawlctl_core::config::ManagerConfig;
use crawlctl_core::outcome::{BadOutcomeMap, OutcomeClassifier, ResultAggregator};
use crawlctl_core::registry::RunningJobRegistry;
use crawlctl_core::request::JobTemplate;
use crawlctl_core::types::{JobKey, JobOutcome, ParamMap};
use crawlctl_jobq::{JobQueueClient, JobQueueError, OwnedJobsFilter};

use crate::error::ManagerError;
use crate::observer::{ManagerObserver, TracingObserver};
use crate::scan::{scan_order_for, ScanOrder, ShuffledOrder};

/// Outcomes observed by one status-check pass, keyed by job.
pub type TickOutcomes = BTreeMap<JobKey, JobOutcome>;

/// State shared by all crawl-manager policies.
pub struct CrawlManager {
    client: Arc<dyn JobQueueClient>,
    template: JobTemplate,
    registry: RunningJobRegistry,
    results: ResultAggregator,
    scan_order: Box<dyn ScanOrder>,
    observer: Arc<dyn ManagerObserver>,
    resumed: bool,
}

impl CrawlManager {
    /// Create a manager with a shuffled scan order and a [`TracingObserver`].
    pub fn new(
        client: Arc<dyn JobQueueClient>,
        template: JobTemplate,
        classifier: OutcomeClassifier,
    ) -> Self {
        Self {
            client,
            template,
            registry: RunningJobRegistry::new(),
            results: ResultAggregator::new(classifier),
            scan_order: Box::new(ShuffledOrder::new()),
            observer: Arc::new(TracingObserver),
            resumed: false,
        }
    }

    /// Create a manager from loaded configuration.
    pub fn from_config(client: Arc<dyn JobQueueClient>, config: &ManagerConfig) -> Self {
        Self::new(
            client,
            config.template.clone(),
            OutcomeClassifier::new(config.bad_outcomes.iter().cloned()),
        )
        .with_scan_order(scan_order_for(config.scan_order, config.scan_seed))
    }

    pub fn with_scan_order(mut self, scan_order: Box<dyn ScanOrder>) -> Self {
        self.scan_order = scan_order;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ManagerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn template(&self) -> &JobTemplate {
        &self.template
    }

    pub fn registry(&self) -> &RunningJobRegistry {
        &self.registry
    }

    pub fn bad_outcomes(&self) -> &BadOutcomeMap {
        self.results.bad_outcomes()
    }

    pub fn observer(&self) -> &Arc<dyn ManagerObserver> {
        &self.observer
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    // ---- operations ----

    /// Seed the registry with this run's running and pending jobs.
    ///
    /// Lists jobs of the template's job type (within its flow, when one
    /// is set) and adds the keys not tracked yet. Performs no
    /// submissions; calling it again adds nothing new. Returns the number
    /// of keys added.
    pub async fn resume(&mut self) -> Result<usize, ManagerError> {
        let filter =
            OwnedJobsFilter::in_flight(self.template.job_type.clone(), self.template.flow_id.clone());
        let keys = self.client.list_owned(&filter).await?;

        let mut added = 0;
        for key in keys {
            if self.registry.insert(key.clone()) {
                self.observer.job_resumed(&key);
                added += 1;
            }
        }
        self.resumed = true;
        Ok(added)
    }

    /// Status-check pass over the registry.
    ///
    /// Visits the tracked jobs in the order chosen by the scan strategy
    /// and stops at the first one still running. Every finished job is
    /// removed from the registry, classified (bad outcomes are kept for
    /// the terminal outcome) and returned.
    pub async fn check_running_jobs(&mut self) -> Result<TickOutcomes, ManagerError> {
        self.ensure_resumed()?;

        let mut outcomes = TickOutcomes::new();
        let order = self.scan_order.order(self.registry.keys());
        for key in order {
            let Some(outcome) = self.client.status(&key).await? else {
                self.observer.job_still_running(&key);
                break;
            };
            self.registry.remove(&key);
            let class = self.results.observe(&key, &outcome);
            self.observer.job_finished(&key, &outcome, class);
            outcomes.insert(key, outcome);
        }
        Ok(outcomes)
    }

    /// Submit one job built from the template.
    ///
    /// `job_type` overrides the template's job type; `args_override`
    /// entries replace same-named template arguments. A duplicate
    /// submission is reported to the observer and yields `Ok(None)`
    /// without tracking anything.
    pub async fn submit(
        &mut self,
        job_type: Option<String>,
        args_override: Option<&ParamMap>,
    ) -> Result<Option<JobKey>, ManagerError> {
        self.ensure_resumed()?;

        let request = self.template.build(job_type, args_override);
        match self.client.submit(&request).await {
            Ok(key) => {
                self.registry.insert(key.clone());
                self.observer.job_submitted(&key, &request);
                Ok(Some(key))
            }
            Err(JobQueueError::DuplicateSubmission(reason)) => {
                self.observer.duplicate_submission(&request, &reason);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First recorded bad outcome, or `finished`.
    pub fn terminal_outcome(&self) -> JobOutcome {
        self.results.terminal_outcome()
    }

    /// Report [`terminal_outcome`](Self::terminal_outcome) as the
    /// manager's own outcome. A manager not running under the job queue
    /// reports nothing. Returns the outcome either way.
    pub async fn finish_own_job(&self) -> Result<JobOutcome, ManagerError> {
        let outcome = self.terminal_outcome();
        let result = self.client.finish_self(&outcome).await?;
        self.observer.own_job_finished(&outcome, &result);
        Ok(outcome)
    }

    // ---- private helpers ----

    fn ensure_resumed(&self) -> Result<(), ManagerError> {
        if self.resumed {
            Ok(())
        } else {
            Err(ManagerError::NotResumed)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
