//! Crawl-manager state machine.
//!
//! [`CrawlManager`] holds the in-flight registry and result aggregation
//! shared by the three scheduling policies:
//!
//! - [`SingleShot`] supervises one job and stops when it finishes.
//! - [`Periodic`] resubmits whenever the previous job finished.
//! - [`GeneratorBounded`] fans out over a [`ParameterSource`] with a
//!   concurrency bound.
//!
//! Policies are driven through [`CrawlPolicy`], one tick at a time.

pub mod error;
pub mod generator;
pub mod manager;
pub mod observer;
pub mod params;
pub mod periodic;
pub mod policy;
pub mod scan;
pub mod single;

pub use error::ManagerError;
pub use generator::GeneratorBounded;
pub use manager::{CrawlManager, TickOutcomes};
pub use observer::{ManagerObserver, TracingObserver};
pub use params::{IterParameters, JsonLinesParameters, JsonValues, ParameterSource};
pub use periodic::Periodic;
pub use policy::{CrawlPolicy, TickDecision};
pub use scan::{InsertionOrder, RotatingOrder, ScanOrder, ShuffledOrder};
pub use single::{SingleShot, SingleShotState};
