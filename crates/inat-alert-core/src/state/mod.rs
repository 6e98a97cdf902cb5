// # Parameter Store
//
// Process-wide mutable state of the service: the filter set, the last seen
// observation count and the subscription state. Nothing is persisted; a
// restart begins unset.

pub mod store;

pub use store::{ParameterStore, StateSnapshot, SubscriptionState};
