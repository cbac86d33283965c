//! Wiring from configuration to a ready-to-run policy.

use std::sync::Arc;

use crawlctl_core::config::{CrawlMode, ManagerConfig};
use crawlctl_core::error::CoreError;
use crawlctl_core::types::JobKey;
use crawlctl_jobq::{JobBehavior, JobQueueClient, SimulatedJobQueue};
use crawlctl_manager::{
    CrawlManager, CrawlPolicy, GeneratorBounded, JsonLinesParameters, ManagerError, Periodic,
    SingleShot,
};

/// Build the policy selected by `config.mode`.
///
/// Generator mode reads its parameters lazily from `PARAMETERS_FILE`
/// (one JSON object per line), which must be set.
pub fn build_policy(
    config: &ManagerConfig,
    client: Arc<dyn JobQueueClient>,
) -> Result<Box<dyn CrawlPolicy>, ManagerError> {
    let manager = CrawlManager::from_config(client, config);

    let policy: Box<dyn CrawlPolicy> = match config.mode {
        CrawlMode::Single => Box::new(SingleShot::new(manager)),
        CrawlMode::Periodic => Box::new(Periodic::new(manager)),
        CrawlMode::Generator => {
            let path = config.parameters_file.as_ref().ok_or_else(|| {
                CoreError::Validation("PARAMETERS_FILE must be set in generator mode".to_string())
            })?;
            let source = JsonLinesParameters::open(path)?;
            Box::new(GeneratorBounded::new(
                manager,
                Box::new(source),
                config.max_running_jobs,
            ))
        }
    };
    Ok(policy)
}

// ---------------------------------------------------------------------------
// Local dry run
// ---------------------------------------------------------------------------

/// Behavior of the in-process job queue used by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub project_id: String,
    pub behavior: JobBehavior,
}

impl SimulationConfig {
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `SIM_PROJECT_ID`           | `0`        |
    /// | `SIM_POLLS_UNTIL_FINISHED` | `1`        |
    /// | `SIM_OUTCOME`              | `finished` |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = JobBehavior::default();

        let polls_until_finished = match get("SIM_POLLS_UNTIL_FINISHED") {
            Some(v) => v.trim().parse().map_err(|_| {
                CoreError::Validation(format!("SIM_POLLS_UNTIL_FINISHED must be a number, got {v}"))
            })?,
            None => defaults.polls_until_finished,
        };
        let outcome = get("SIM_OUTCOME").unwrap_or_else(|| defaults.outcome.to_string());

        Ok(Self {
            project_id: get("SIM_PROJECT_ID").unwrap_or_else(|| "0".to_string()),
            behavior: JobBehavior::new(polls_until_finished, outcome),
        })
    }

    pub fn into_queue(self, own_job_key: Option<JobKey>) -> SimulatedJobQueue {
        let queue = SimulatedJobQueue::new(self.project_id).with_default_behavior(self.behavior);
        match own_job_key {
            Some(key) => queue.with_own_job_key(key),
            None => queue,
        }
    }
}
