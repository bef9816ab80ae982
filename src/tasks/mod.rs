//! Background Tasks Module
//!
//! Contains the tasks that run for the lifetime of the service.
//!
//! # Tasks
//! - Refresh Scheduler: runs the refresh jobs that keep cached datasets warm
//! - Local Tier Cleanup: drops expired local entries at configured intervals

mod cleanup;
mod refresh_jobs;
mod retry;
mod scheduler;

pub use cleanup::spawn_cleanup_task;
pub use refresh_jobs::{register_refresh_jobs, JobIntervals};
pub use retry::{run_with_retry, RetryPolicy};
pub use scheduler::{
    until_next_daily, JobDescriptor, JobState, JobStatus, RefreshScheduler, Schedule,
};
