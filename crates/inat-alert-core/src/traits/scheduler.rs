// # Check Scheduler Trait
//
// Defines the interface for firing the count check on a timer.
//
// Exactly one job exists at a time. Arming a new job replaces the current
// one; jobs are addressed by the explicit `JobHandle` returned when armed.
//
// ## Implementations
//
// - `CronScheduler`: tokio-cron-scheduler backed, in this crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Handle to an armed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(Uuid);

impl JobHandle {
    /// Wrap a scheduler job id
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying scheduler job id
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time of day (UTC) for the daily job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTime {
    /// Hour, 0-23
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
}

impl DailyTime {
    /// Create a validated time of day
    pub fn new(hour: u8, minute: u8) -> Result<Self, crate::Error> {
        if hour > 23 || minute > 59 {
            return Err(crate::Error::config(format!(
                "Daily time out of range: {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Six-field cron expression (sec min hour dom month dow)
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl Default for DailyTime {
    fn default() -> Self {
        Self { hour: 8, minute: 0 }
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02} UTC", self.hour, self.minute)
    }
}

impl FromStr for DailyTime {
    type Err = crate::Error;

    /// Parse `HH:MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::config(format!("Expected HH:MM, got '{}'", s));

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

/// Trait for timers that drive the count check
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from request handlers and
/// from jobs. Firings run independently of the caller and never block it.
#[async_trait]
pub trait CheckScheduler: Send + Sync {
    /// Fire the check every `period`, independent of wall-clock alignment
    async fn arm_interval(&self, period: Duration) -> Result<JobHandle, crate::Error>;

    /// Fire the check once a day at `at`
    async fn arm_cron(&self, at: DailyTime) -> Result<JobHandle, crate::Error>;

    /// Stop future firings of `handle`
    ///
    /// Idempotent: disarming a job that is no longer armed is a no-op.
    /// An in-flight check is never interrupted.
    async fn disarm(&self, handle: JobHandle) -> Result<(), crate::Error>;

    /// Re-enable the daily job at the configured time
    async fn rearm_cron(&self) -> Result<JobHandle, crate::Error>;
}
