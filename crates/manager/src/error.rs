use crawlctl_core::error::CoreError;
use crawlctl_jobq::JobQueueError;

/// Errors that abort a tick (or the whole run) of a crawl manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Configuration or parameter error from `crawlctl_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job-queue call failed for good.
    #[error(transparent)]
    JobQueue(#[from] JobQueueError),

    /// A tick or submission was attempted before `resume()`.
    #[error("resume() must run before the first tick")]
    NotResumed,
}
