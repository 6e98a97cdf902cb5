// # SMTP Notification Transport
//
// This crate provides the SMTP implementation of `NotificationTransport`.
//
// ## Behavior
//
// - STARTTLS relay with username/password login
// - One send attempt per notification; no retries
// - Bounded send timeout
// - Failures are classified into `EmailErrorCategory` so the notifier can
//   log the reason
//
// ## Security Requirements
//
// - The password NEVER appears in logs or Debug output
// - The password is read from the environment only
// - Without a password the transport is still built but every send is
//   skipped with `EmailErrorCategory::MissingCredentials`

use async_trait::async_trait;
use inat_alert_core::config::SmtpConfig;
use inat_alert_core::traits::NotificationTransport;
use inat_alert_core::{EmailErrorCategory, Error, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// SMTP transport with fixed sender, recipient and subject
pub struct SmtpTransport {
    /// Relay connection; `None` when no password was configured
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,

    /// Relay host, for logging
    server: String,

    /// Relay port, for logging
    port: u16,

    /// Sender
    from: Mailbox,

    /// Recipient
    to: Mailbox,

    /// Subject line
    subject: String,
}

// Custom Debug implementation that never reaches the credentials
impl std::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransport")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .field("subject", &self.subject)
            .field("credentials", &self.mailer.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl SmtpTransport {
    /// Create a transport from configuration
    ///
    /// # Errors
    ///
    /// `Error::Config` if an address does not parse or the relay cannot be
    /// set up.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::config(format!("Invalid sender address '{}': {}", config.from, e)))?;
        let to: Mailbox = config
            .to
            .parse()
            .map_err(|e| Error::config(format!("Invalid recipient address '{}': {}", config.to, e)))?;

        let mailer = match config.password.as_deref() {
            Some(password) if config.has_credentials() => {
                let relay = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                    .map_err(|e| {
                        Error::config(format!("Invalid SMTP relay '{}': {}", config.server, e))
                    })?
                    .port(config.port)
                    .credentials(Credentials::new(config.username.clone(), password.to_string()))
                    .timeout(Some(Duration::from_secs(config.timeout_secs)))
                    .build();
                Some(relay)
            }
            _ => None,
        };

        Ok(Self {
            mailer,
            server: config.server.clone(),
            port: config.port,
            from,
            to,
            subject: config.subject.clone(),
        })
    }

    /// Whether sends will be attempted
    pub fn has_credentials(&self) -> bool {
        self.mailer.is_some()
    }

    /// Build the HTML message
    pub fn build_message(&self, html_body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| Error::email(EmailErrorCategory::Other, format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl NotificationTransport for SmtpTransport {
    async fn deliver(&self, html_body: &str) -> Result<()> {
        let Some(mailer) = &self.mailer else {
            return Err(Error::email(
                EmailErrorCategory::MissingCredentials,
                "SMTP_PASSWORD is not set",
            ));
        };

        let message = self.build_message(html_body)?;

        tracing::debug!("Sending alert to {} via {}:{}", self.to, self.server, self.port);

        mailer.send(message).await.map(|_| ()).map_err(|e| {
            let category = classify(
                e.status().map(|code| code.to_string()).as_deref(),
                e.is_tls(),
                e.is_response() || e.is_permanent() || e.is_transient(),
            );
            Error::email(category, e.to_string())
        })
    }

    fn transport_name(&self) -> &'static str {
        "smtp"
    }
}

/// Map an SMTP failure onto a logging category
///
/// - `status`: three-digit reply code, if the server answered
/// - `tls`: the STARTTLS negotiation failed
/// - `protocol`: the server replied with an error or an unparsable reply
fn classify(status: Option<&str>, tls: bool, protocol: bool) -> EmailErrorCategory {
    // 530 auth required, 534 mechanism too weak, 535 credentials invalid
    if status.is_some_and(|code| code.starts_with("53")) {
        return EmailErrorCategory::Authentication;
    }
    if tls || protocol {
        return EmailErrorCategory::Protocol;
    }
    EmailErrorCategory::Other
}
