//! Domain types and pure logic for the crawl manager.
//!
//! This crate performs no I/O: job keys and outcomes, outcome
//! classification, the in-flight job registry, submission building and
//! configuration parsing. The job-queue client lives in `crawlctl-jobq`
//! and the scheduling state machine in `crawlctl-manager`.

pub mod config;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod request;
pub mod types;
