//! Periodic policy: resubmit the same job every time the previous one
//! finishes.
//!
//! Never stops on its own; the driver decides when to stop ticking
//! (loop interval, time limit, cancellation). Closing reports nothing
//! for the manager's own job.

use async_trait::async_trait;
use crawlctl_core::types::JobOutcome;

use crate::error::ManagerError;
use crate::manager::CrawlManager;
use crate::policy::{CrawlPolicy, TickDecision};

pub struct Periodic {
    manager: CrawlManager,
    rounds: u64,
}

impl Periodic {
    pub fn new(manager: CrawlManager) -> Self {
        Self { manager, rounds: 0 }
    }

    /// Jobs submitted by this policy so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

#[async_trait]
impl CrawlPolicy for Periodic {
    fn name(&self) -> &'static str {
        "periodic"
    }

    fn manager(&self) -> &CrawlManager {
        &self.manager
    }

    fn manager_mut(&mut self) -> &mut CrawlManager {
        &mut self.manager
    }

    async fn tick(&mut self) -> Result<TickDecision, ManagerError> {
        self.manager.check_running_jobs().await?;
        if self.manager.registry().is_empty() && self.manager.submit(None, None).await?.is_some() {
            self.rounds += 1;
        }
        Ok(TickDecision::Continue)
    }

    async fn close(&mut self) -> Result<Option<JobOutcome>, ManagerError> {
        tracing::debug!(rounds = self.rounds, "Periodic manager closed without outcome");
        Ok(None)
    }
}
