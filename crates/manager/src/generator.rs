//! Bounded-concurrency fan-out driven by a [`ParameterSource`].
//!
//! Every tick checks the running jobs, then tops the registry up to the
//! concurrency bound by pulling parameter maps from the source. The run
//! is complete once the source is exhausted and every submitted job has
//! finished. An unbounded run drains the whole source in one tick, so an
//! infinite source needs a bound.

use async_trait::async_trait;
use crawlctl_core::request::take_job_type_override;

use crate::error::ManagerError;
use crate::manager::CrawlManager;
use crate::params::ParameterSource;
use crate::policy::{CrawlPolicy, TickDecision};

pub struct GeneratorBounded {
    manager: CrawlManager,
    source: Box<dyn ParameterSource>,
    max_running_jobs: Option<usize>,
    exhausted: bool,
    pulled: u64,
}

impl GeneratorBounded {
    /// `max_running_jobs` of `None` means unbounded.
    pub fn new(
        manager: CrawlManager,
        source: Box<dyn ParameterSource>,
        max_running_jobs: Option<usize>,
    ) -> Self {
        Self {
            manager,
            source,
            max_running_jobs,
            exhausted: false,
            pulled: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Elements consumed from the source so far.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    fn below_bound(&self) -> bool {
        self.max_running_jobs
            .map_or(true, |max| self.manager.registry().len() < max)
    }
}

#[async_trait]
impl CrawlPolicy for GeneratorBounded {
    fn name(&self) -> &'static str {
        "generator"
    }

    fn manager(&self) -> &CrawlManager {
        &self.manager
    }

    fn manager_mut(&mut self) -> &mut CrawlManager {
        &mut self.manager
    }

    async fn tick(&mut self) -> Result<TickDecision, ManagerError> {
        self.manager.check_running_jobs().await?;

        while !self.exhausted && self.below_bound() {
            let Some(next) = self.source.next_params() else {
                self.exhausted = true;
                self.manager
                    .observer()
                    .parameters_exhausted(self.pulled, self.manager.registry().len());
                break;
            };
            self.pulled += 1;

            let mut params = next?;
            let job_type = take_job_type_override(&mut params)?;
            self.manager.submit(job_type, Some(&params)).await?;
        }

        if self.exhausted && self.manager.registry().is_empty() {
            return Ok(TickDecision::Stop);
        }
        Ok(TickDecision::Continue)
    }
}
