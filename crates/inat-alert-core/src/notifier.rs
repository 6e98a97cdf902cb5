//! Notification composition and delivery
//!
//! The [`Notifier`] appends an unsubscribe link to the message text, hands
//! the HTML to a [`NotificationTransport`] and swallows any failure after
//! logging it. Delivery failures never reach the caller and are never
//! retried.

use std::sync::Arc;
use tracing::{error, info};

use crate::error::{EmailErrorCategory, Error};
use crate::traits::NotificationTransport;

/// Sends alert messages to the fixed recipient
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn NotificationTransport>,
    unsubscribe_url: String,
}

impl Notifier {
    /// Create a notifier
    ///
    /// # Parameters
    ///
    /// - `transport`: Delivery transport
    /// - `unsubscribe_url`: Fully-qualified URL of the unsubscribe endpoint
    pub fn new(transport: Arc<dyn NotificationTransport>, unsubscribe_url: impl Into<String>) -> Self {
        Self {
            transport,
            unsubscribe_url: unsubscribe_url.into(),
        }
    }

    /// Render the message text plus the unsubscribe link as HTML
    pub fn compose(&self, body_text: &str) -> String {
        let paragraphs = body_text
            .trim()
            .lines()
            .map(str::trim)
            .map(escape_html)
            .collect::<Vec<_>>()
            .join("<br>");

        format!(
            "<p>{}</p><p>If you wish to unsubscribe, please click <a href='{}'>here</a>.</p>",
            paragraphs,
            escape_html(&self.unsubscribe_url)
        )
    }

    /// Compose and deliver a message
    ///
    /// Returns `true` if the transport accepted the message.
    pub async fn notify(&self, body_text: &str) -> bool {
        let html = self.compose(body_text);

        match self.transport.deliver(&html).await {
            Ok(()) => {
                info!("Email sent successfully via {}", self.transport.transport_name());
                true
            }
            Err(e) => {
                log_delivery_failure(&e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("transport", &self.transport.transport_name())
            .field("unsubscribe_url", &self.unsubscribe_url)
            .finish()
    }
}

fn log_delivery_failure(err: &Error) {
    match err {
        Error::Email {
            category: EmailErrorCategory::MissingCredentials,
            ..
        } => {
            error!("SMTP password is not configured, skipping email: {}", err);
        }
        Error::Email {
            category: EmailErrorCategory::Authentication,
            ..
        } => {
            error!("SMTP authentication failed. Check your SMTP username and password: {}", err);
        }
        Error::Email {
            category: EmailErrorCategory::Protocol,
            ..
        } => {
            error!("SMTP error occurred: {}", err);
        }
        _ => {
            error!("An error occurred while sending email: {}", err);
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
