//! Error types for the alert service
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for alert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a failed notification delivery
///
/// Used to log delivery failures with a distinguishing reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailErrorCategory {
    /// No credential was configured, so no send was attempted
    MissingCredentials,
    /// The server rejected the username/password
    Authentication,
    /// SMTP protocol or TLS negotiation failure
    Protocol,
    /// Anything else (connection refused, timeout, message building)
    Other,
}

impl std::fmt::Display for EmailErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EmailErrorCategory::MissingCredentials => "missing credentials",
            EmailErrorCategory::Authentication => "authentication",
            EmailErrorCategory::Protocol => "protocol",
            EmailErrorCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Core error type for the alert service
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed control-surface input
    #[error("{0}")]
    Validation(String),

    /// Network or HTTP failure talking to the counting API
    #[error("Transport error: {0}")]
    Transport(String),

    /// Counting API answered with an unexpected body
    #[error("Unexpected API response format: {0}")]
    Format(String),

    /// Notification delivery failure
    #[error("Email error ({category}): {message}")]
    Email {
        /// Failure category
        category: EmailErrorCategory,
        /// Error message
        message: String,
    },

    /// Job scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error reporting a missing key
    pub fn missing_parameter(name: &str) -> Self {
        Self::Validation(format!("Missing parameter: {}", name))
    }

    /// Create a validation error reporting a key with the wrong type
    pub fn invalid_parameter(name: &str) -> Self {
        Self::Validation(format!("Invalid parameter: {}", name))
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a response format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a categorized email error
    pub fn email(category: EmailErrorCategory, message: impl Into<String>) -> Self {
        Self::Email {
            category,
            message: message.into(),
        }
    }

    /// Create a scheduler error
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was caused by caller input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for Error {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::Scheduler(err.to_string())
    }
}
