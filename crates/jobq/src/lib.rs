//! Job-queue client library.
//!
//! Defines the [`JobQueueClient`](client::JobQueueClient) contract the
//! crawl manager consumes and an in-process
//! [`SimulatedJobQueue`](simulated::SimulatedJobQueue) implementation for
//! local dry runs and tests.

pub mod client;
pub mod simulated;

pub use client::{JobQueueClient, JobQueueError, OwnedJobsFilter, SelfFinish};
pub use simulated::{JobBehavior, JobRecord, SimulatedJobQueue};
