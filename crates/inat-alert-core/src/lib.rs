// # inat-alert-core
//
// Core library for the iNaturalist observation-count alert service.
//
// ## Architecture Overview
//
// - **CountSource**: Trait for querying the observation-count API
// - **NotificationTransport**: Trait for delivering alert emails
// - **CheckScheduler**: Trait for firing checks on a timer
// - **CountChecker**: Compares totals and notifies on increase
// - **ParameterStore**: Filter set, last seen count and subscription state
// - **ControlSurface**: Update and unsubscribe operations
//
// ## Flow
//
// 1. `ControlSurface::update` stores filters and runs an immediate check
// 2. The scheduler fires `CountChecker::run_scheduled` periodically
// 3. A grown total sends exactly one notification through the `Notifier`

pub mod traits;
pub mod checker;
pub mod control;
pub mod config;
pub mod error;
pub mod notifier;
pub mod scheduler;
pub mod state;

// Re-export core types for convenience
pub use traits::{CheckScheduler, CountSource, DailyTime, FilterSet, JobHandle, NotificationTransport};
pub use checker::{CheckOutcome, CountChecker};
pub use control::{ControlSurface, UnsubscribeOutcome};
pub use config::{ApiConfig, ScheduleConfig, ServerConfig, SmtpConfig, WatchConfig};
pub use error::{EmailErrorCategory, Error, Result};
pub use notifier::Notifier;
pub use scheduler::CronScheduler;
pub use state::{ParameterStore, StateSnapshot, SubscriptionState};
