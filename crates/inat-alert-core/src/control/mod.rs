//! Control operations exposed to the HTTP boundary
//!
//! ## Subscription state machine
//!
//! ```text
//!              unsubscribe()
//! Subscribed ───────────────► Unsubscribed
//!     ▲                            │
//!     └──────── update() ──────────┘
//!            (rearms daily job)
//! ```
//!
//! `unsubscribe()` on an already unsubscribed service is a no-op that
//! reports so.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::checker::{CheckOutcome, CountChecker};
use crate::error::{Error, Result};
use crate::state::{ParameterStore, SubscriptionState};
use crate::traits::{CheckScheduler, FilterSet};

/// Result of an unsubscribe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    /// The job was disarmed by this call
    Unsubscribed,
    /// No job was armed
    AlreadyUnsubscribed,
}

/// Mutates filters and subscription on behalf of external callers
pub struct ControlSurface {
    store: ParameterStore,
    checker: Arc<CountChecker>,
    scheduler: Arc<dyn CheckScheduler>,
}

impl ControlSurface {
    /// Create a control surface
    pub fn new(
        store: ParameterStore,
        checker: Arc<CountChecker>,
        scheduler: Arc<dyn CheckScheduler>,
    ) -> Self {
        Self {
            store,
            checker,
            scheduler,
        }
    }

    /// Shared state this surface mutates
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Replace the filter set and check immediately
    ///
    /// `body` must carry `acc`, `identified` and `photos` as booleans and
    /// `taxon_name` as a string. On a missing or mistyped key nothing is
    /// changed. On success the count is reset to zero, so any positive total
    /// from the immediate check notifies. If the service was unsubscribed the
    /// daily job is rearmed.
    pub async fn update(&self, body: &Value) -> Result<()> {
        let filters = parse_filters(body)?;
        info!("Updating API parameters: taxon '{}'", filters.taxon_name);

        let checker = self.checker.clone();
        match tokio::spawn(async move { checker.reset_and_check(filters).await }).await {
            Ok(CheckOutcome::Failed { reason }) => info!("Immediate check failed: {}", reason),
            Ok(_) => {}
            Err(e) => error!("Immediate check aborted: {}", e),
        }

        let mut subscription = self.store.lock_subscription().await;
        if !subscription.is_subscribed() {
            let handle = self.scheduler.rearm_cron().await?;
            *subscription = SubscriptionState::Subscribed(handle);
            info!("Rescheduled daily task.");
        }

        Ok(())
    }

    /// Disarm the periodic job
    pub async fn unsubscribe(&self) -> Result<UnsubscribeOutcome> {
        let mut subscription = self.store.lock_subscription().await;

        match *subscription {
            SubscriptionState::Subscribed(handle) => {
                self.scheduler.disarm(handle).await?;
                *subscription = SubscriptionState::Unsubscribed;
                info!("Unsubscribed from daily task.");
                Ok(UnsubscribeOutcome::Unsubscribed)
            }
            SubscriptionState::Unsubscribed => Ok(UnsubscribeOutcome::AlreadyUnsubscribed),
        }
    }
}

impl std::fmt::Debug for ControlSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSurface")
            .field("checker", &self.checker)
            .finish()
    }
}

/// Extract a complete filter set from an update body
pub fn parse_filters(body: &Value) -> Result<FilterSet> {
    let flag = |key: &str| -> Result<bool> {
        match body.get(key) {
            None => Err(Error::missing_parameter(key)),
            Some(value) => value.as_bool().ok_or_else(|| Error::invalid_parameter(key)),
        }
    };

    let include_accurate = flag("acc")?;
    let include_identified = flag("identified")?;
    let include_photos = flag("photos")?;
    let taxon_name = match body.get("taxon_name") {
        None => return Err(Error::missing_parameter("taxon_name")),
        Some(value) => value
            .as_str()
            .ok_or_else(|| Error::invalid_parameter("taxon_name"))?,
    };

    Ok(FilterSet::new(
        include_accurate,
        include_identified,
        include_photos,
        taxon_name,
    ))
}
