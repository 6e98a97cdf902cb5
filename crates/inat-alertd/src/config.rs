//! Daemon configuration, read from environment variables only

use anyhow::{Context, Result};
use inat_alert_core::{DailyTime, WatchConfig};
use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug)]
pub struct Config {
    /// Service configuration handed to the core
    pub watch: WatchConfig,
    /// Max tracing level
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut watch = WatchConfig::new();

        if let Some(port) = lookup("PORT") {
            watch.server.port = parse_var("PORT", &port)?;
        }
        watch.server.public_url = lookup("INAT_ALERT_PUBLIC_URL");

        if let Some(url) = lookup("INAT_ALERT_API_URL") {
            watch.api.url = url;
        }
        if let Some(timeout) = lookup("INAT_ALERT_API_TIMEOUT_SECS") {
            watch.api.timeout_secs = parse_var("INAT_ALERT_API_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(server) = lookup("INAT_ALERT_SMTP_SERVER") {
            watch.smtp.server = server;
        }
        if let Some(port) = lookup("INAT_ALERT_SMTP_PORT") {
            watch.smtp.port = parse_var("INAT_ALERT_SMTP_PORT", &port)?;
        }
        watch.smtp.username = lookup("INAT_ALERT_SMTP_USERNAME").unwrap_or_default();
        watch.smtp.password = lookup("SMTP_PASSWORD");
        watch.smtp.from =
            lookup("INAT_ALERT_EMAIL_FROM").unwrap_or_else(|| watch.smtp.username.clone());
        watch.smtp.to =
            lookup("INAT_ALERT_EMAIL_TO").unwrap_or_else(|| watch.smtp.username.clone());
        if let Some(subject) = lookup("INAT_ALERT_EMAIL_SUBJECT") {
            watch.smtp.subject = subject;
        }

        if let Some(interval) = lookup("INAT_ALERT_STARTUP_INTERVAL_SECS") {
            watch.schedule.startup_interval_secs =
                parse_var("INAT_ALERT_STARTUP_INTERVAL_SECS", &interval)?;
        }
        if let Some(daily_at) = lookup("INAT_ALERT_DAILY_AT") {
            watch.schedule.daily_at = DailyTime::from_str(&daily_at)
                .map_err(|e| anyhow::anyhow!("INAT_ALERT_DAILY_AT: {}", e))?;
        }

        Ok(Self {
            watch,
            log_level: lookup("INAT_ALERT_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.watch.smtp.username.is_empty() {
            anyhow::bail!(
                "INAT_ALERT_SMTP_USERNAME is required. \
                Set it via: export INAT_ALERT_SMTP_USERNAME=you@example.org"
            );
        }

        self.watch
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if let Some(password) = &self.watch.smtp.password {
            let lower = password.to_lowercase();
            if lower.contains("your_password") || lower.contains("replace_me") {
                anyhow::bail!(
                    "SMTP_PASSWORD appears to be a placeholder. \
                    Use an actual app password from your mail provider."
                );
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "INAT_ALERT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a valid number. Got: '{}'", name, value))
}
