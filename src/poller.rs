//! Poll loop: one authenticated fetch-and-publish cycle at a time
//!
//! Cycle: ensure session -> fetch dashboard -> (session expired: re-login,
//! fetch once more) -> decode readings -> publish. A second `logged_in:false`
//! right after a fresh login aborts the cycle with [`AmtronError::SessionExpired`].
//! HTTP status failures abort the cycle without retry; the next attempt
//! happens after the regular delay.

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::{AmtronError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::metrics::ChargerMetrics;
use crate::parsers::Readings;
use crate::session::{SessionManager, SessionState};
use crate::transport::{DASHBOARD_PATH, Transport};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Poll statistics, published after every cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollStatus {
    pub version: String,
    pub device: String,
    pub total_cycles: u64,
    pub failed_cycles: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<String>,
    pub last_cycle_ms: Option<u64>,
    pub last_error: Option<String>,
    /// Readings that fell back to their sentinel in the last successful cycle
    pub sentinel_readings: Vec<String>,
    pub session_logins: u64,
    pub session_state: String,
}

/// Orchestrates session, fetch, decode and publish
pub struct Poller<T: Transport> {
    transport: T,
    session: SessionManager,
    metrics: Arc<ChargerMetrics>,
    interval: Duration,
    status_tx: watch::Sender<PollStatus>,
    logger: StructuredLogger,
}

impl<T: Transport> Poller<T> {
    pub fn new(config: &Config, transport: T, metrics: Arc<ChargerMetrics>) -> Self {
        let device = format!("{}:{}", config.device.ip, config.device.port);
        let logger = get_logger_with_context(LogContext::new("poller").with_device(&device));
        let (status_tx, _) = watch::channel(PollStatus {
            version: env!("APP_VERSION").to_string(),
            device,
            session_state: session_state_name(&SessionState::NeverEstablished).to_string(),
            ..PollStatus::default()
        });

        Self {
            transport,
            session: SessionManager::new(&config.device),
            metrics,
            interval: Duration::from_secs(config.poll_interval_seconds),
            status_tx,
            logger,
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PollStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> PollStatus {
        self.status_tx.borrow().clone()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one dashboard document, renewing the session once if the device
    /// reports it expired
    pub async fn fetch_dashboard(&mut self) -> Result<Dashboard> {
        let session_id = self.session.ensure_session(&self.transport).await?;
        let dashboard = self.fetch(&session_id).await?;
        if !dashboard.session_expired() {
            return Ok(dashboard);
        }

        self.session.mark_expired();
        self.logger.info("Session expired; logging in again");
        let session_id = self.session.login(&self.transport).await?;
        let dashboard = self.fetch(&session_id).await?;
        if dashboard.session_expired() {
            self.session.mark_expired();
            return Err(AmtronError::SessionExpired);
        }
        Ok(dashboard)
    }

    async fn fetch(&self, session_id: &str) -> Result<Dashboard> {
        let reply = self
            .transport
            .get_json(DASHBOARD_PATH, Some(session_id))
            .await?;
        if !reply.is_ok() {
            return Err(AmtronError::http_status(
                reply.status,
                self.transport.url(DASHBOARD_PATH),
            ));
        }
        Ok(Dashboard::new(reply.body))
    }

    /// Run one complete cycle and publish its readings
    pub async fn poll_once(&mut self) -> Result<Readings> {
        let started = Instant::now();
        let outcome = self.fetch_dashboard().await.map(|dashboard| {
            let readings = Readings::from_dashboard(&dashboard);
            self.metrics.publish(&readings);
            readings
        });
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.record(&outcome, elapsed_ms);
        outcome
    }

    fn record(&self, outcome: &Result<Readings>, elapsed_ms: u64) {
        let logins = self.session.login_count();
        let state = session_state_name(self.session.state());
        self.status_tx.send_modify(|s| {
            s.total_cycles += 1;
            s.last_cycle_ms = Some(elapsed_ms);
            s.session_logins = logins;
            s.session_state = state.to_string();
            match outcome {
                Ok(readings) => {
                    s.consecutive_failures = 0;
                    s.last_success = Some(chrono::Utc::now().to_rfc3339());
                    s.last_error = None;
                    s.sentinel_readings = readings
                        .fallbacks
                        .iter()
                        .map(|name| (*name).to_string())
                        .collect();
                }
                Err(e) => {
                    s.failed_cycles += 1;
                    s.consecutive_failures += 1;
                    s.last_error = Some(e.to_string());
                }
            }
        });
    }

    fn report_failure(&self, err: &AmtronError) {
        match err {
            AmtronError::AuthRejected => self.logger.error(
                "Unable to sign in to charger web interface; check username and password",
            ),
            AmtronError::DeviceNotReady { .. } => self.logger.error(&format!(
                "The charger needs to be configured before scraping metrics: {}",
                err
            )),
            e if e.is_transport_failure() => self.logger.error(&format!(
                "Fetch failed, retrying on next poll: {}",
                e
            )),
            e => self.logger.error(&format!("Poll cycle failed: {}", e)),
        }
    }

    /// Poll until `shutdown` resolves. Each cycle runs to completion; the
    /// delay starts after the cycle ends.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.logger.info(&format!(
            "Polling every {}s",
            self.interval.as_secs()
        ));

        loop {
            self.logger
                .info("Starting to fetch information from charger web interface");
            match self.poll_once().await {
                Ok(readings) if readings.is_complete() => {
                    self.logger.info("Finished fetching information; sleeping");
                }
                Ok(readings) => self.logger.info(&format!(
                    "Finished fetching information with sentinels for {}; sleeping",
                    readings.fallbacks.join(", ")
                )),
                Err(e) => self.report_failure(&e),
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.logger.info("Poll loop stopped");
    }
}

fn session_state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::NeverEstablished => "never_established",
        SessionState::Valid(_) => "valid",
        SessionState::Expired => "expired",
        SessionState::Cleared => "cleared",
    }
}
