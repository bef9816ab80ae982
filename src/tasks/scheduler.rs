//! Refresh Scheduler
//!
//! Runs a fixed set of independently timed jobs for the lifetime of the
//! process. Each job has its own tokio task and timer, so a slow job never
//! delays another job's tick. A job never overlaps with itself: ticks that
//! come due while a run is still going are skipped.
//!
//! Failures (including panics) are logged and recorded in the job's status;
//! the job goes back to idle and waits for its next tick.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{CacheError, Result};
use crate::tasks::retry::{run_with_retry, RetryPolicy};

type JobFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

// == Schedule ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed period, first tick one period after registration
    Every(Duration),
    /// Once a day at the given UTC wall-clock time
    DailyAt { hour: u32, minute: u32 },
}

impl Schedule {
    fn describe(&self) -> String {
        match self {
            Schedule::Every(period) => format!("every {}ms", period.as_millis()),
            Schedule::DailyAt { hour, minute } => format!("daily at {hour:02}:{minute:02} UTC"),
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Schedule::Every(period) if period.is_zero() => Err(CacheError::Configuration(
                "job period must be greater than zero".to_string(),
            )),
            Schedule::DailyAt { hour, minute } if hour > 23 || minute > 59 => {
                Err(CacheError::Configuration(format!(
                    "invalid daily time {hour:02}:{minute:02}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Time until the next `hour:minute` UTC strictly after `now`.
pub fn until_next_daily(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .map(|naive| naive.and_utc());

    let next = match today {
        Some(at) if at > now => at,
        Some(at) => at + chrono::Duration::days(1),
        None => now + chrono::Duration::days(1),
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

// == Job Descriptor ==
/// Registration-time description of a job. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub name: String,
    pub schedule: Schedule,
    pub retry: Option<RetryPolicy>,
    /// Also run once immediately at registration
    pub run_on_start: bool,
}

impl JobDescriptor {
    pub fn every(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            schedule: Schedule::Every(period),
            retry: None,
            run_on_start: false,
        }
    }

    pub fn daily_at(name: impl Into<String>, hour: u32, minute: u32) -> Self {
        Self {
            name: name.into(),
            schedule: Schedule::DailyAt { hour, minute },
            retry: None,
            run_on_start: false,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn run_on_start(mut self) -> Self {
        self.run_on_start = true;
        self
    }
}

// == Job Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub schedule: String,
    pub state: JobState,
    pub runs: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_run_at: Option<DateTime<Utc>>,
}

type SharedStatus = Arc<Mutex<JobStatus>>;

fn lock_status(status: &SharedStatus) -> MutexGuard<'_, JobStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct RegisteredJob {
    status: SharedStatus,
    handle: JoinHandle<()>,
}

// == Refresh Scheduler ==
pub struct RefreshScheduler {
    jobs: Mutex<Vec<RegisteredJob>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs: Mutex::new(Vec::new()),
            shutdown_tx,
        }
    }

    fn jobs(&self) -> MutexGuard<'_, Vec<RegisteredJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Register Job ==
    /// Starts a job. Must be called from within a tokio runtime. An invalid
    /// schedule is rejected here, before anything is spawned.
    pub fn register_job<F, Fut>(&self, descriptor: JobDescriptor, job: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        descriptor.schedule.validate()?;

        let job: JobFn = Arc::new(move || job().boxed());
        let status = Arc::new(Mutex::new(JobStatus {
            name: descriptor.name.clone(),
            schedule: descriptor.schedule.describe(),
            state: JobState::Idle,
            runs: 0,
            failures: 0,
            last_error: None,
            last_run_at: None,
        }));

        info!(
            job = %descriptor.name,
            schedule = %descriptor.schedule.describe(),
            retry = ?descriptor.retry,
            "registered refresh job"
        );

        let handle = tokio::spawn(job_loop(
            descriptor,
            job,
            status.clone(),
            self.shutdown_tx.subscribe(),
        ));
        self.jobs().push(RegisteredJob { status, handle });
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.jobs().len()
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs()
            .iter()
            .map(|job| lock_status(&job.status).clone())
            .collect()
    }

    // == Shutdown ==
    /// Stops every job loop. Runs in progress get `grace` to finish before
    /// their loops are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);
        let jobs: Vec<RegisteredJob> = self.jobs().drain(..).collect();

        for mut job in jobs {
            let name = lock_status(&job.status).name.clone();
            if tokio::time::timeout(grace, &mut job.handle).await.is_err() {
                warn!(job = %name, "job did not stop within grace period, aborting");
                job.handle.abort();
                // Wait for the loop to be dropped so its run is aborted too
                let _ = job.handle.await;
            }
        }
        info!("refresh scheduler stopped");
    }
}

async fn job_loop(
    descriptor: JobDescriptor,
    job: JobFn,
    status: SharedStatus,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    if descriptor.run_on_start {
        run_once(&descriptor, &job, &status).await;
    }

    match descriptor.schedule {
        Schedule::Every(period) => {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let started = Instant::now();
                        run_once(&descriptor, &job, &status).await;
                        if started.elapsed() > period {
                            debug!(job = %descriptor.name, "run outlasted its period, skipping missed ticks");
                        }
                    }
                }
            }
        }
        Schedule::DailyAt { hour, minute } => loop {
            let wait = until_next_daily(Utc::now(), hour, minute);
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    run_once(&descriptor, &job, &status).await;
                }
            }
        },
    }

    debug!(job = %descriptor.name, "job loop stopped");
}

/// Aborts the spawned run when dropped, so a job loop aborted at shutdown
/// does not leave its current run behind.
struct RunGuard(JoinHandle<Result<()>>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One attempt, spawned so a panicking job is reported instead of taking
/// the job loop down with it.
async fn attempt(job: &JobFn) -> Result<()> {
    let mut run = RunGuard(tokio::spawn(job()));
    match (&mut run.0).await {
        Ok(result) => result,
        Err(join_err) => Err(CacheError::Internal(format!("job panicked: {join_err}"))),
    }
}

async fn run_once(descriptor: &JobDescriptor, job: &JobFn, status: &SharedStatus) {
    lock_status(status).state = JobState::Running;

    let result = match descriptor.retry {
        Some(policy) => run_with_retry(&descriptor.name, policy, || attempt(job)).await,
        None => attempt(job).await.map_err(|e| CacheError::Job {
            name: descriptor.name.clone(),
            attempts: 1,
            message: e.to_string(),
        }),
    };

    let mut status = lock_status(status);
    status.state = JobState::Idle;
    status.runs += 1;
    status.last_run_at = Some(Utc::now());
    match result {
        Ok(()) => {
            status.last_error = None;
            debug!(job = %descriptor.name, "job run succeeded");
        }
        Err(e) => {
            status.failures += 1;
            status.last_error = Some(e.to_string());
            error!(job = %descriptor.name, error = %e, "scheduled job failed");
        }
    }
}
