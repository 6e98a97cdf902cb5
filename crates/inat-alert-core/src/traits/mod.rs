//! Core traits for the alert service
//!
//! This module defines the abstract interfaces at the external seams.
//!
//! - [`CountSource`]: Query the observation-count API
//! - [`NotificationTransport`]: Deliver a composed notification
//! - [`CheckScheduler`]: Fire the count check on a timer

pub mod count_source;
pub mod notification;
pub mod scheduler;

pub use count_source::{CountSource, FilterSet};
pub use notification::NotificationTransport;
pub use scheduler::{CheckScheduler, DailyTime, JobHandle};
