// # inat-alertd - iNaturalist Alert Daemon
//
// Thin integration layer: all counting, notification and subscription logic
// lives in inat-alert-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the iNaturalist source, SMTP transport and scheduler
// 4. Serving the control endpoints until SIGINT/SIGTERM
//
// ## Configuration
//
// ### Control surface
// - `PORT`: Listening port (default 5000, bound on 0.0.0.0)
// - `INAT_ALERT_PUBLIC_URL`: Base URL used in the unsubscribe link
//
// ### Counting API
// - `INAT_ALERT_API_URL`: species_counts endpoint
// - `INAT_ALERT_API_TIMEOUT_SECS`: Request timeout (default 10)
//
// ### Email
// - `SMTP_PASSWORD`: SMTP password (sends are skipped when unset)
// - `INAT_ALERT_SMTP_USERNAME`: SMTP login (required)
// - `INAT_ALERT_SMTP_SERVER` / `INAT_ALERT_SMTP_PORT`: Relay (default smtp.gmail.com:587)
// - `INAT_ALERT_EMAIL_FROM` / `INAT_ALERT_EMAIL_TO`: Addresses (default: the login)
// - `INAT_ALERT_EMAIL_SUBJECT`: Subject line
//
// ### Schedule
// - `INAT_ALERT_STARTUP_INTERVAL_SECS`: Period of the startup job (default 15)
// - `INAT_ALERT_DAILY_AT`: UTC time of the daily job after resubscribing (default 08:00)
//
// ## Example
//
// ```bash
// export INAT_ALERT_SMTP_USERNAME=alerts@example.org
// export SMTP_PASSWORD=app_password
// export INAT_ALERT_PUBLIC_URL=https://alerts.example.org
//
// inat-alertd
// curl -X POST localhost:5000/update -H 'content-type: application/json' \
//   -d '{"acc": true, "identified": true, "photos": true, "taxon_name": "Danaus plexippus"}'
// ```

mod config;
mod http;

use anyhow::{Context, Result};
use inat_alert_core::{
    CheckScheduler, ControlSurface, CountChecker, CronScheduler, Notifier, ParameterStore,
    SubscriptionState,
};
use inat_alert_inaturalist::InaturalistCountSource;
use inat_alert_smtp::SmtpTransport;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::http::AppState;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound for stopping the scheduler after the server has drained
const SCHEDULER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum AlertExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AlertExitCode> for ExitCode {
    fn from(code: AlertExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AlertExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return AlertExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AlertExitCode::ConfigError.into();
    }

    info!("Starting inat-alertd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AlertExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            AlertExitCode::RuntimeError
        } else {
            AlertExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let watch = config.watch;

    let source = Arc::new(InaturalistCountSource::from_config(&watch.api));
    info!("Counting API: {}", source.url());

    let transport =
        Arc::new(SmtpTransport::from_config(&watch.smtp).context("Failed to set up SMTP transport")?);
    if transport.has_credentials() {
        info!(
            "Notifications go to {} via {}:{}",
            watch.smtp.to, watch.smtp.server, watch.smtp.port
        );
    } else {
        warn!("SMTP_PASSWORD is not set; notifications will be logged and skipped");
    }

    let unsubscribe_url = watch.server.unsubscribe_url();
    info!("Unsubscribe link: {}", unsubscribe_url);

    let notifier = Notifier::new(transport, unsubscribe_url);
    let store = ParameterStore::new(SubscriptionState::Unsubscribed);
    let checker = Arc::new(CountChecker::new(source, notifier, store.clone()));

    let scheduler = Arc::new(
        CronScheduler::new(checker.clone(), watch.schedule.daily_at)
            .await
            .context("Failed to start scheduler")?,
    );
    let startup_job = scheduler
        .arm_interval(Duration::from_secs(watch.schedule.startup_interval_secs))
        .await
        .context("Failed to arm startup job")?;
    *store.lock_subscription().await = SubscriptionState::Subscribed(startup_job);

    let control = Arc::new(ControlSurface::new(store, checker, scheduler.clone()));
    let app = http::router(AppState {
        control: control.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], watch.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown signal error: {}", e),
            }
        })
        .await
        .context("Server error")?;

    info!("Stopping scheduler");
    match tokio::time::timeout(SCHEDULER_SHUTDOWN_TIMEOUT, scheduler.shutdown()).await {
        Ok(result) => result.context("Failed to stop scheduler")?,
        Err(_) => anyhow::bail!(
            "Scheduler shutdown timeout after {:?}",
            SCHEDULER_SHUTDOWN_TIMEOUT
        ),
    }

    let last = control.store().snapshot().await;
    info!(
        "Shut down cleanly (observation count: {:?}, last checked: {:?})",
        last.observation_count, last.last_checked_at
    );
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
