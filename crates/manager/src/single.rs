//! Single-shot policy: supervise one job and stop when it finishes.
//!
//! The close outcome of the manager is inherited from the supervised job
//! (a bad outcome is propagated, anything else closes as `finished`).

use async_trait::async_trait;

use crate::error::ManagerError;
use crate::manager::CrawlManager;
use crate::policy::{CrawlPolicy, TickDecision};

/// Progress of a [`SingleShot`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleShotState {
    /// Nothing tracked yet.
    Idle,
    /// One job is tracked.
    Running,
    /// A completion was observed.
    Done,
}

pub struct SingleShot {
    manager: CrawlManager,
    state: SingleShotState,
}

impl SingleShot {
    pub fn new(manager: CrawlManager) -> Self {
        Self {
            manager,
            state: SingleShotState::Idle,
        }
    }

    pub fn state(&self) -> SingleShotState {
        self.state
    }

    fn sync_state(&mut self) {
        if self.state != SingleShotState::Done && !self.manager.registry().is_empty() {
            self.state = SingleShotState::Running;
        }
    }
}

#[async_trait]
impl CrawlPolicy for SingleShot {
    fn name(&self) -> &'static str {
        "single"
    }

    fn manager(&self) -> &CrawlManager {
        &self.manager
    }

    fn manager_mut(&mut self) -> &mut CrawlManager {
        &mut self.manager
    }

    async fn resume(&mut self) -> Result<usize, ManagerError> {
        let added = self.manager.resume().await?;
        self.sync_state();
        Ok(added)
    }

    async fn tick(&mut self) -> Result<TickDecision, ManagerError> {
        if self.state == SingleShotState::Done {
            return Ok(TickDecision::Stop);
        }

        let outcomes = self.manager.check_running_jobs().await?;
        if !outcomes.is_empty() {
            // First completion ends the run, whatever the outcome.
            self.state = SingleShotState::Done;
            return Ok(TickDecision::Stop);
        }

        if self.manager.registry().is_empty() {
            self.manager.submit(None, None).await?;
            self.sync_state();
        }
        Ok(TickDecision::Continue)
    }
}
