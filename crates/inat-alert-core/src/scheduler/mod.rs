//! Timer that fires the count check
//!
//! [`CronScheduler`] wraps a `tokio_cron_scheduler::JobScheduler` and keeps
//! at most one job armed. Every firing runs the check on its own task, so a
//! slow API or SMTP server never delays the scheduler and a panic inside a
//! check is logged instead of tearing the job down.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::checker::{CheckOutcome, CountChecker};
use crate::error::{Error, Result};
use crate::traits::{CheckScheduler, DailyTime, JobHandle};

/// tokio-cron-scheduler backed [`CheckScheduler`]
pub struct CronScheduler {
    inner: JobScheduler,
    checker: Arc<CountChecker>,
    daily_at: DailyTime,
    current: Mutex<Option<JobHandle>>,
}

impl CronScheduler {
    /// Create and start a scheduler with no job armed
    ///
    /// # Parameters
    ///
    /// - `checker`: Checker invoked on every firing
    /// - `daily_at`: Time used by [`CheckScheduler::rearm_cron`]
    pub async fn new(checker: Arc<CountChecker>, daily_at: DailyTime) -> Result<Self> {
        let inner = JobScheduler::new().await?;
        inner.start().await?;

        Ok(Self {
            inner,
            checker,
            daily_at,
            current: Mutex::new(None),
        })
    }

    /// Currently armed job, if any
    pub async fn current(&self) -> Option<JobHandle> {
        *self.current.lock().await
    }

    /// Next time the job will fire
    pub async fn next_fire(&self, handle: JobHandle) -> Option<DateTime<Utc>> {
        let mut inner = self.inner.clone();
        match inner.next_tick_for_job(handle.id()).await {
            Ok(next) => next,
            Err(e) => {
                debug!("Could not read next tick for job {}: {}", handle, e);
                None
            }
        }
    }

    /// Stop the scheduler; armed jobs never fire again
    pub async fn shutdown(&self) -> Result<()> {
        let mut inner = self.inner.clone();
        inner.shutdown().await?;
        *self.current.lock().await = None;
        info!("Scheduler stopped");
        Ok(())
    }

    /// Swap the armed job for `job`
    async fn replace(&self, job: Job, description: &str) -> Result<JobHandle> {
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            self.inner.remove(&previous.id()).await?;
            debug!("Replaced job {}", previous);
        }

        let handle = JobHandle::new(self.inner.add(job).await?);
        *current = Some(handle);
        drop(current);

        match self.next_fire(handle).await {
            Some(next) => info!("Armed {} job {} (next run at {})", description, handle, next),
            None => info!("Armed {} job {}", description, handle),
        }

        Ok(handle)
    }
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("daily_at", &self.daily_at)
            .finish()
    }
}

#[async_trait]
impl CheckScheduler for CronScheduler {
    async fn arm_interval(&self, period: Duration) -> Result<JobHandle> {
        if period.is_zero() {
            return Err(Error::scheduler("Interval period must be > 0"));
        }

        let checker = self.checker.clone();
        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            fire(checker.clone())
        })?;

        self.replace(job, &format!("{:?} interval", period)).await
    }

    async fn arm_cron(&self, at: DailyTime) -> Result<JobHandle> {
        let checker = self.checker.clone();
        let job = Job::new_async(at.cron_expression().as_str(), move |_uuid, _lock| {
            fire(checker.clone())
        })?;

        self.replace(job, &format!("daily {}", at)).await
    }

    async fn disarm(&self, handle: JobHandle) -> Result<()> {
        let mut current = self.current.lock().await;

        if *current != Some(handle) {
            debug!("Job {} is not armed, nothing to disarm", handle);
            return Ok(());
        }

        self.inner.remove(&handle.id()).await?;
        *current = None;
        info!("Disarmed job {}", handle);
        Ok(())
    }

    async fn rearm_cron(&self) -> Result<JobHandle> {
        self.arm_cron(self.daily_at).await
    }
}

/// Run one scheduled check, isolated on its own task
fn fire(checker: Arc<CountChecker>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let task = tokio::spawn(async move { checker.run_scheduled().await });

        match task.await {
            Ok(CheckOutcome::Failed { reason }) => debug!("Scheduled check failed: {}", reason),
            Ok(outcome) => debug!("Scheduled check finished: {:?}", outcome),
            Err(e) => error!("Scheduled check aborted: {}", e),
        }
    })
}
