//! Observation count checker
//!
//! The CountChecker is responsible for:
//! - Querying the count API via CountSource
//! - Comparing the reported total with the stored count
//! - Notifying on increase
//! - Recording the new total
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐   total_results   ┌──────────────┐
//! │ CountSource │ ────────────────► │ CountChecker │
//! └─────────────┘                   └──────────────┘
//!                                           │
//!                     ┌─────────────────────┴───────────────┐
//!                     ▼                                     ▼
//!             ┌────────────────┐                    ┌─────────────┐
//!             │ ParameterStore │                    │  Notifier   │
//!             │ (record count) │                    │ (increase)  │
//!             └────────────────┘                    └─────────────┘
//! ```
//!
//! 1. Query the API with the filter set
//! 2. On failure, log and leave the count untouched
//! 3. Compare against the stored count; notify once if it grew
//! 4. Overwrite the stored count, whether it grew, held or shrank

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::notifier::Notifier;
use crate::state::ParameterStore;
use crate::traits::{CountSource, FilterSet};

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No filter set has been configured yet
    Skipped,

    /// The query failed; state was not touched
    Failed {
        /// Error message
        reason: String,
    },

    /// A total was recorded
    Recorded {
        /// Stored count before this check
        previous: Option<u64>,
        /// Newly recorded total
        total: u64,
        /// Whether a notification was attempted
        notified: bool,
    },
}

/// Compares observation totals and notifies on increase
///
/// ## Threading
///
/// Check cycles are serialized: a check triggered by the control surface and
/// one fired by the scheduler never interleave, so a delta is always computed
/// against the count the previous cycle recorded. Filter replacement happens
/// inside a cycle too, and scheduled cycles read the filters only once they
/// hold the lock.
pub struct CountChecker {
    /// Count API client
    source: Arc<dyn CountSource>,

    /// Notification sender
    notifier: Notifier,

    /// Shared service state
    store: ParameterStore,

    /// Serializes check cycles
    cycle: Mutex<()>,
}

impl CountChecker {
    /// Create a new checker
    pub fn new(source: Arc<dyn CountSource>, notifier: Notifier, store: ParameterStore) -> Self {
        Self {
            source,
            notifier,
            store,
            cycle: Mutex::new(()),
        }
    }

    /// Run one check with the given filters
    ///
    /// Sends at most one notification.
    pub async fn check(&self, filters: &FilterSet) -> CheckOutcome {
        let cycle = self.cycle.lock().await;
        self.run_cycle(&cycle, filters).await
    }

    /// Replace the filters, reset the count to zero and check immediately
    ///
    /// Waits for an in-flight check to finish first, so that check records
    /// against the filters it queried with and the reset baseline is only
    /// compared against the new filter set's total.
    pub async fn reset_and_check(&self, filters: FilterSet) -> CheckOutcome {
        let cycle = self.cycle.lock().await;
        self.store.replace_filters(filters.clone()).await;
        self.run_cycle(&cycle, &filters).await
    }

    /// Run one check with the stored filters
    ///
    /// No-op when no filter set has been configured.
    pub async fn run_scheduled(&self) -> CheckOutcome {
        let cycle = self.cycle.lock().await;
        match self.store.filters().await {
            Some(filters) => self.run_cycle(&cycle, &filters).await,
            None => {
                info!("API parameters are not set.");
                CheckOutcome::Skipped
            }
        }
    }

    /// Query, compare, notify and record; `_cycle` proves the lock is held
    async fn run_cycle(&self, _cycle: &MutexGuard<'_, ()>, filters: &FilterSet) -> CheckOutcome {
        debug!(
            "Checking {} for taxon '{}' (acc={}, identified={}, photos={})",
            self.source.source_name(),
            filters.taxon_name,
            filters.include_accurate,
            filters.include_identified,
            filters.include_photos
        );

        let total = match self.source.total_results(filters).await {
            Ok(total) => total,
            Err(e) => {
                match &e {
                    Error::Format(_) => error!("Unexpected API response format: {}", e),
                    _ => error!("Request to {} failed: {}", self.source.source_name(), e),
                }
                return CheckOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        info!("Total results: {}", total);

        let previous = self.store.observation_count().await;
        let notified = match previous {
            Some(stored) if total > stored => {
                let message = increase_message(total - stored, total, &filters.taxon_name);
                self.notifier.notify(&message).await;
                true
            }
            Some(stored) if total < stored => {
                warn!(
                    "Observation count for '{}' decreased from {} to {}",
                    filters.taxon_name, stored, total
                );
                false
            }
            _ => false,
        };

        self.store.record_count(total).await;

        CheckOutcome::Recorded {
            previous,
            total,
            notified,
        }
    }
}

impl std::fmt::Debug for CountChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountChecker")
            .field("source", &self.source.source_name())
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Message body announcing new observations
pub fn increase_message(delta: u64, total: u64, taxon_name: &str) -> String {
    format!(
        "{} New observations of '{}'\n\
         Currently, {} observations are available in the iNaturalist app!",
        delta, taxon_name, total
    )
}
