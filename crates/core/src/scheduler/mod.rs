//! Iteration scheduler for repeated concurrent uploads.
//!
//! The scheduler validates the session, fetches one upload destination, and
//! then runs a fixed number of iterations. Each iteration:
//! - **Fan-out**: spawns exactly `threads` upload workers against the shared destination
//! - **Fan-in**: drains exactly `threads` outcomes from a bounded channel
//! - **Cooldown**: sleeps `cooldown_secs` before the next iteration

mod config;
mod runner;
mod types;
mod worker;

pub use config::SchedulerConfig;
pub use runner::{UploadScheduler, OUTCOME_CHANNEL_CAPACITY};
pub use types::{Outcome, OutcomeStatus, RunSummary, SchedulerError, SchedulerState, Stage};
pub use worker::{run_upload, UploadContext};
