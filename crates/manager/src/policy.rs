//! The tick interface shared by all scheduling policies.

use async_trait::async_trait;
use crawlctl_core::types::JobOutcome;

use crate::error::ManagerError;
use crate::manager::CrawlManager;

/// What the driver should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Continue,
    Stop,
}

impl std::fmt::Debug for dyn CrawlPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlPolicy").field("name", &self.name()).finish_non_exhaustive()
    }
}

/// A scheduling policy driven one tick at a time by an external loop.
///
/// Each policy owns a [`CrawlManager`] and composes its operations. The
/// driver calls [`resume`](Self::resume) once, then
/// [`tick`](Self::tick) until it returns [`TickDecision::Stop`] (or the
/// driver gives up), then [`close`](Self::close).
#[async_trait]
pub trait CrawlPolicy: Send {
    fn name(&self) -> &'static str;

    fn manager(&self) -> &CrawlManager;

    fn manager_mut(&mut self) -> &mut CrawlManager;

    /// Rebuild in-flight tracking from the job queue.
    async fn resume(&mut self) -> Result<usize, ManagerError> {
        self.manager_mut().resume().await
    }

    async fn tick(&mut self) -> Result<TickDecision, ManagerError>;

    /// Report the run's terminal outcome for the manager's own job.
    ///
    /// Returns the outcome, or `None` for policies that do not propagate
    /// one.
    async fn close(&mut self) -> Result<Option<JobOutcome>, ManagerError> {
        self.manager().finish_own_job().await.map(Some)
    }
}
