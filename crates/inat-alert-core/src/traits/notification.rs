// # Notification Transport Trait
//
// Defines the interface for delivering an already-composed HTML message to
// the fixed recipient. Sender, recipient and subject are transport
// configuration, not call arguments.

use async_trait::async_trait;

/// Trait for notification transports
///
/// Errors must be returned as [`crate::Error::Email`] with a category so the
/// [`crate::Notifier`] can log the reason. Transports never retry.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver an HTML body
    async fn deliver(&self, html_body: &str) -> Result<(), crate::Error>;

    /// Transport name for logging
    fn transport_name(&self) -> &'static str;
}
