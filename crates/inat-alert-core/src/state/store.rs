// # In-Memory Parameter Store
//
// ## Locking
//
// Filters and the observation count share one mutex, so readers never see a
// new filter set paired with the previous set's count. Whole check cycles,
// including filter replacement, are serialized by `CountChecker`.
//
// The subscription state has its own mutex; callers hold it across scheduler calls so that a
// concurrent update and unsubscribe cannot arm two jobs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::traits::{FilterSet, JobHandle};

/// Whether the periodic job is currently armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// A job is armed
    Subscribed(JobHandle),
    /// No job is armed
    Unsubscribed,
}

impl SubscriptionState {
    /// Check whether a job is armed
    pub fn is_subscribed(&self) -> bool {
        matches!(self, SubscriptionState::Subscribed(_))
    }
}

/// Point-in-time copy of the store, for logging and inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    /// Current filter set, if any update has been accepted
    pub filters: Option<FilterSet>,
    /// Last recorded total, `None` until first set
    pub observation_count: Option<u64>,
    /// Whether the periodic job is armed
    pub subscribed: bool,
    /// Time of the last successful count query
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Params {
    filters: Option<FilterSet>,
    observation_count: Option<u64>,
    last_checked_at: Option<DateTime<Utc>>,
}

/// Shared, internally synchronized service state
///
/// Cloning is cheap; all clones observe the same state.
///
/// # Example
///
/// ```rust,no_run
/// use inat_alert_core::state::{ParameterStore, SubscriptionState};
/// use inat_alert_core::FilterSet;
///
/// #[tokio::main]
/// async fn main() {
///     let store = ParameterStore::new(SubscriptionState::Unsubscribed);
///
///     store.replace_filters(FilterSet::new(true, true, true, "Danaus plexippus")).await;
///     assert_eq!(store.observation_count().await, Some(0));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ParameterStore {
    params: Arc<Mutex<Params>>,
    subscription: Arc<Mutex<SubscriptionState>>,
}

impl ParameterStore {
    /// Create an unset store with the given initial subscription
    pub fn new(subscription: SubscriptionState) -> Self {
        Self {
            params: Arc::new(Mutex::new(Params::default())),
            subscription: Arc::new(Mutex::new(subscription)),
        }
    }

    /// Current filter set
    pub async fn filters(&self) -> Option<FilterSet> {
        self.params.lock().await.filters.clone()
    }

    /// Last recorded observation count
    pub async fn observation_count(&self) -> Option<u64> {
        self.params.lock().await.observation_count
    }

    /// Replace the filter set and reset the count to zero
    pub async fn replace_filters(&self, filters: FilterSet) {
        let mut guard = self.params.lock().await;
        guard.filters = Some(filters);
        guard.observation_count = Some(0);
    }

    /// Overwrite the observation count, returning the previous value
    pub async fn record_count(&self, total: u64) -> Option<u64> {
        let mut guard = self.params.lock().await;
        guard.last_checked_at = Some(Utc::now());
        guard.observation_count.replace(total)
    }

    /// Current subscription state
    pub async fn subscription(&self) -> SubscriptionState {
        *self.subscription.lock().await
    }

    /// Lock the subscription state for a read-modify-write
    pub async fn lock_subscription(&self) -> MutexGuard<'_, SubscriptionState> {
        self.subscription.lock().await
    }

    /// Copy the whole state
    pub async fn snapshot(&self) -> StateSnapshot {
        let subscribed = self.subscription().await.is_subscribed();
        let guard = self.params.lock().await;
        StateSnapshot {
            filters: guard.filters.clone(),
            observation_count: guard.observation_count,
            subscribed,
            last_checked_at: guard.last_checked_at,
        }
    }
}
