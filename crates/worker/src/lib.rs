//! Process-level driver for the crawl manager: the tick loop and the
//! wiring from environment configuration to a policy.

pub mod runner;
pub mod setup;
