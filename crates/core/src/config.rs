//! Manager configuration loaded from environment variables.

use std::path::PathBuf;

use crate::error::CoreError;
use crate::outcome::DEFAULT_BAD_OUTCOMES;
use crate::request::{parse_param_map, JobTemplate};
use crate::types::JobKey;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Scheduling policy run by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Supervise one job and stop once it finishes.
    Single,
    /// Resubmit the same job every time the previous one finishes.
    Periodic,
    /// Fan out over a parameter sequence with bounded concurrency.
    Generator,
}

impl CrawlMode {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(CrawlMode::Single),
            "periodic" => Ok(CrawlMode::Periodic),
            "generator" => Ok(CrawlMode::Generator),
            other => Err(CoreError::Validation(format!(
                "CRAWL_MODE must be one of single, periodic, generator (got \"{other}\")"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlMode::Single => "single",
            CrawlMode::Periodic => "periodic",
            CrawlMode::Generator => "generator",
        }
    }
}

/// Order in which the status-check pass visits tracked jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrderKind {
    Shuffle,
    Rotate,
}

impl ScanOrderKind {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shuffle" => Ok(ScanOrderKind::Shuffle),
            "rotate" => Ok(ScanOrderKind::Rotate),
            other => Err(CoreError::Validation(format!(
                "SCAN_ORDER must be shuffle or rotate (got \"{other}\")"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ManagerConfig
// ---------------------------------------------------------------------------

/// Everything needed to build and drive a crawl manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub mode: CrawlMode,
    /// Submission settings; also carries the flow id scoping resume.
    pub template: JobTemplate,
    /// Concurrency bound for generator mode. `None` means unbounded.
    pub max_running_jobs: Option<usize>,
    pub bad_outcomes: Vec<String>,
    /// The manager's own job key. `None` for local invocations.
    pub own_job_key: Option<JobKey>,
    pub scan_order: ScanOrderKind,
    pub scan_seed: Option<u64>,
    /// Seconds between ticks. `0` runs a single tick.
    pub loop_interval_secs: u64,
    /// Auto-shutdown after this many seconds. `0` disables the limit.
    pub max_running_time_secs: u64,
    pub parameters_file: Option<PathBuf>,
}

impl ManagerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default                     |
    /// |-------------------------|-----------------------------|
    /// | `CRAWL_MODE`            | `single`                    |
    /// | `SPIDER`                | required                    |
    /// | `SPIDER_ARGS`           | `{}`                        |
    /// | `JOB_SETTINGS`          | `{}`                        |
    /// | `UNITS`                 | unset                       |
    /// | `MAX_RUNNING_JOBS`      | unbounded                   |
    /// | `FLOW_ID`               | unset                       |
    /// | `FLOW_ID_REQUIRED`      | `false`                     |
    /// | `MANAGER_NAME`          | unset                       |
    /// | `CHILDREN_TAGS`         | empty (comma-separated)     |
    /// | `BAD_OUTCOMES`          | [`DEFAULT_BAD_OUTCOMES`]    |
    /// | `OWN_JOB_KEY`           | unset                       |
    /// | `SCAN_ORDER`            | `shuffle`                   |
    /// | `SCAN_SEED`             | unset                       |
    /// | `LOOP_INTERVAL_SECS`    | `0`                         |
    /// | `MAX_RUNNING_TIME_SECS` | `0`                         |
    /// | `PARAMETERS_FILE`       | unset                       |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match get("CRAWL_MODE") {
            Some(v) => CrawlMode::parse(&v)?,
            None => CrawlMode::Single,
        };

        let job_type = get("SPIDER")
            .ok_or_else(|| CoreError::Validation("SPIDER must be set".to_string()))?;

        let job_args = parse_param_map(
            &get("SPIDER_ARGS").unwrap_or_else(|| "{}".into()),
            "SPIDER_ARGS",
        )?;
        let job_settings = parse_param_map(
            &get("JOB_SETTINGS").unwrap_or_else(|| "{}".into()),
            "JOB_SETTINGS",
        )?;

        let units = parse_opt::<u32>(get("UNITS"), "UNITS")?;

        let max_running_jobs = parse_opt::<usize>(get("MAX_RUNNING_JOBS"), "MAX_RUNNING_JOBS")?;
        if max_running_jobs == Some(0) {
            return Err(CoreError::Validation(
                "MAX_RUNNING_JOBS must be at least 1".to_string(),
            ));
        }

        let flow_id_required = parse_bool(get("FLOW_ID_REQUIRED"), "FLOW_ID_REQUIRED")?;
        let flow_id = match get("FLOW_ID") {
            Some(id) => Some(id),
            None if flow_id_required => Some(generate_flow_id()),
            None => None,
        };

        let bad_outcomes = match get("BAD_OUTCOMES") {
            Some(v) => split_list(&v),
            None => DEFAULT_BAD_OUTCOMES.iter().map(|s| s.to_string()).collect(),
        };

        let scan_order = match get("SCAN_ORDER") {
            Some(v) => ScanOrderKind::parse(&v)?,
            None => ScanOrderKind::Shuffle,
        };

        let template = JobTemplate {
            job_type,
            job_args,
            job_settings,
            units,
            children_tags: get("CHILDREN_TAGS").map(|v| split_list(&v)).unwrap_or_default(),
            flow_id,
            name: get("MANAGER_NAME"),
        };

        Ok(Self {
            mode,
            template,
            max_running_jobs,
            bad_outcomes,
            own_job_key: get("OWN_JOB_KEY").map(JobKey::new),
            scan_order,
            scan_seed: parse_opt::<u64>(get("SCAN_SEED"), "SCAN_SEED")?,
            loop_interval_secs: parse_opt::<u64>(get("LOOP_INTERVAL_SECS"), "LOOP_INTERVAL_SECS")?
                .unwrap_or(0),
            max_running_time_secs: parse_opt::<u64>(
                get("MAX_RUNNING_TIME_SECS"),
                "MAX_RUNNING_TIME_SECS",
            )?
            .unwrap_or(0),
            parameters_file: get("PARAMETERS_FILE").map(PathBuf::from),
        })
    }
}

/// Fresh flow id for runs that must be scoped but were given none.
pub fn generate_flow_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn parse_opt<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
) -> Result<Option<T>, CoreError> {
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|_| {
                CoreError::Validation(format!(
                    "{field} must be a non-negative integer (got \"{v}\")"
                ))
            })
        })
        .transpose()
}

fn parse_bool(value: Option<String>, field: &str) -> Result<bool, CoreError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no") => Ok(false),
        Some(v) => Err(CoreError::Validation(format!(
            "{field} must be a boolean (got \"{v}\")"
        ))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
