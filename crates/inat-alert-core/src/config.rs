//! Configuration types for the alert service
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

use crate::traits::DailyTime;

/// Default iNaturalist species-count endpoint
pub const DEFAULT_API_URL: &str = "https://api.inaturalist.org/v1/observations/species_counts";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Counting API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Outbound email settings
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Job cadence settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Control surface settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl WatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.smtp.validate()?;
        self.schedule.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

/// Counting API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Species-count endpoint URL
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("API timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

/// SMTP configuration
///
/// The Debug implementation does NOT expose the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host
    #[serde(default = "default_smtp_server")]
    pub server: String,

    /// SMTP port (STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login username
    #[serde(default)]
    pub username: String,

    /// Login password; when absent sends are skipped
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Sender address
    #[serde(default)]
    pub from: String,

    /// Recipient address
    #[serde(default)]
    pub to: String,

    /// Subject line
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Send timeout (in seconds)
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SmtpConfig {
    /// Validate the SMTP configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.server.is_empty() {
            return Err(crate::Error::config("SMTP server cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("SMTP port must be > 0"));
        }
        for (name, address) in [("sender", &self.from), ("recipient", &self.to)] {
            if !address.contains('@') {
                return Err(crate::Error::config(format!(
                    "SMTP {} address is not an email address: '{}'",
                    name, address
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("SMTP timeout must be > 0"));
        }
        Ok(())
    }

    /// Whether a password is available for login
    pub fn has_credentials(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty())
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: String::new(),
            password: None,
            from: String::new(),
            to: String::new(),
            subject: default_subject(),
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

/// Job cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Period of the job armed at startup (in seconds)
    #[serde(default = "default_startup_interval_secs")]
    pub startup_interval_secs: u64,

    /// UTC time of the daily job armed after a resubscribe
    #[serde(default)]
    pub daily_at: DailyTime,
}

impl ScheduleConfig {
    /// Validate the schedule configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.startup_interval_secs == 0 {
            return Err(crate::Error::config("Startup interval must be > 0"));
        }
        DailyTime::new(self.daily_at.hour, self.daily_at.minute)?;
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            startup_interval_secs: default_startup_interval_secs(),
            daily_at: DailyTime::default(),
        }
    }
}

/// Control surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port (bound on all interfaces)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used for the unsubscribe link
    #[serde(default)]
    pub public_url: Option<String>,
}

impl ServerConfig {
    /// Validate the server configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(url) = &self.public_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "Public URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }
        Ok(())
    }

    /// Fully-qualified URL of the unsubscribe endpoint
    pub fn unsubscribe_url(&self) -> String {
        let base = self
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port));
        format!("{}/unsubscribe", base.trim_end_matches('/'))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "iNaturalist Species Count Alert".to_string()
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

fn default_startup_interval_secs() -> u64 {
    15
}

fn default_port() -> u16 {
    5000
}
