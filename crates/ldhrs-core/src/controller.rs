//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Controller lifecycle: state owner, periodic producers, command surface."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use ldhrs_common::config::AppConfig;
use ldhrs_metrics::{ControllerMetrics, SharedRegistry};
use ldhrs_oracle::TextOracle;
use ldhrs_rt::{RateLimiter, TaskSet};
use ldhrs_sim::{Axis, TelemetrySimulator};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::audit::{run_audit, AuditOutcome, AuditRequest, AuditState, AUDIT_FALLBACK};
use crate::error::ControllerError;
use crate::safety::{self, CommandOutcome, SafetyView};
use crate::state::SystemState;
use crate::telemetry;
use crate::weather::{self, ExtractedWeather, WeatherMonitor};

const TRANSITION_QUEUE_DEPTH: usize = 64;

/// Controller entrypoint. Nothing runs until [`TelemetryController::start`].
#[derive(Debug)]
pub struct TelemetryController {
    config: Arc<AppConfig>,
    oracle: Arc<dyn TextOracle>,
    metrics_registry: Option<SharedRegistry>,
}

impl TelemetryController {
    pub fn new(
        config: AppConfig,
        oracle: Arc<dyn TextOracle>,
        metrics: Option<SharedRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            oracle,
            metrics_registry: metrics,
        }
    }

    /// Spawn the state owner, the telemetry ticker and the weather monitor.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(self) -> Result<ControllerHandle> {
        let metrics = match &self.metrics_registry {
            Some(registry) => Some(
                ControllerMetrics::new(registry.clone())
                    .context("failed to register controller metrics")?,
            ),
            None => None,
        };

        let initial = Arc::new(SystemState::from_config(&self.config.controller.initial));
        if let Some(metrics) = &metrics {
            metrics.set_shut_down(initial.is_shut_down);
        }
        let (state_tx, state_rx) = watch::channel(Arc::clone(&initial));
        let (audit_tx, audit_rx) = watch::channel(AuditState::Idle);
        let (transition_tx, transition_rx) = mpsc::channel(TRANSITION_QUEUE_DEPTH);
        let (shutdown_tx, _) = broadcast::channel(4);

        let owner = StateOwner {
            state: initial,
            sim: TelemetrySimulator::new(self.config.controller.random_seed),
            state_tx,
            audit_tx,
            audits: JoinSet::new(),
            oracle: Arc::clone(&self.oracle),
            location: self.config.weather.location.clone(),
            web_search: self.config.oracle.web_search,
            metrics: metrics.clone(),
        };
        let monitor = WeatherMonitor::new(
            Arc::clone(&self.oracle),
            &self.config.weather,
            self.config.oracle.web_search,
        );
        let telemetry_period = self.config.controller.telemetry_interval_ms;
        let weather_period = self.config.weather.poll_interval_secs;

        let mut tasks = TaskSet::new();
        tasks.spawn(
            "state-owner",
            owner.run(transition_rx, shutdown_tx.subscribe()),
        );
        tasks.spawn(
            "telemetry-ticker",
            run_telemetry(telemetry_period, transition_tx.clone(), shutdown_tx.subscribe()),
        );
        tasks.spawn(
            "weather-monitor",
            run_weather(
                monitor,
                weather_period,
                transition_tx.clone(),
                metrics,
                shutdown_tx.subscribe(),
            ),
        );

        info!(
            telemetry_interval_ms = telemetry_period.as_millis() as u64,
            weather_interval_secs = weather_period.as_secs(),
            location = %self.config.weather.location,
            "controller started"
        );

        Ok(ControllerHandle {
            client: ControllerClient {
                transitions: transition_tx,
                state: state_rx,
                audit: audit_rx,
            },
            shutdown: shutdown_tx,
            tasks: Some(tasks),
        })
    }
}

/// Cloneable command and subscription surface of a running controller.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    transitions: mpsc::Sender<Transition>,
    state: watch::Receiver<Arc<SystemState>>,
    audit: watch::Receiver<AuditState>,
}

impl ControllerClient {
    /// Receiver that is notified once per accepted transition.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemState>> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> Arc<SystemState> {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> SafetyView {
        SafetyView::evaluate(&self.snapshot())
    }

    pub fn audit(&self) -> watch::Receiver<AuditState> {
        self.audit.clone()
    }

    pub fn audit_state(&self) -> AuditState {
        self.audit.borrow().clone()
    }

    pub async fn set_angle(
        &self,
        axis: Axis,
        degrees: f64,
    ) -> Result<CommandOutcome, ControllerError> {
        self.request(|reply| Transition::SetAngle {
            axis,
            degrees,
            reply,
        })
        .await
    }

    /// Returns the new lock state.
    pub async fn toggle_child_lock(&self) -> Result<bool, ControllerError> {
        self.toggle(Toggle::ChildLock).await
    }

    /// Returns the new auto-track state.
    pub async fn toggle_auto_track(&self) -> Result<bool, ControllerError> {
        self.toggle(Toggle::AutoTrack).await
    }

    /// Returns the new shutdown state.
    pub async fn toggle_shutdown(&self) -> Result<bool, ControllerError> {
        self.toggle(Toggle::Shutdown).await
    }

    /// Start an audit for `identity`. The result lands in [`ControllerClient::audit`].
    pub async fn request_audit(
        &self,
        identity: impl Into<String>,
    ) -> Result<AuditRequest, ControllerError> {
        let identity = identity.into();
        self.request(|reply| Transition::RequestAudit { identity, reply })
            .await
    }

    async fn toggle(&self, toggle: Toggle) -> Result<bool, ControllerError> {
        self.request(|reply| Transition::Toggle { toggle, reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Transition,
    ) -> Result<T, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.transitions
            .send(build(reply_tx))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        reply_rx.await.map_err(|_| ControllerError::Stopped)
    }
}

/// Owning handle of a running controller. Dropping it aborts every task.
#[derive(Debug)]
pub struct ControllerHandle {
    client: ControllerClient,
    shutdown: broadcast::Sender<()>,
    tasks: Option<TaskSet>,
}

impl ControllerHandle {
    pub fn client(&self) -> ControllerClient {
        self.client.clone()
    }

    /// Cancel the ticker, the weather monitor and any in-flight audit, then
    /// wait for every task to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.shutdown.send(());
        if let Some(tasks) = self.tasks.take() {
            tasks.join().await?;
        }
        info!("controller shutdown complete");
        Ok(())
    }
}

impl Deref for ControllerHandle {
    type Target = ControllerClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            let _ = self.shutdown.send(());
            tasks.abort_all();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    ChildLock,
    AutoTrack,
    Shutdown,
}

impl Toggle {
    fn command(self) -> &'static str {
        match self {
            Toggle::ChildLock => "toggle_child_lock",
            Toggle::AutoTrack => "toggle_auto_track",
            Toggle::Shutdown => "toggle_shutdown",
        }
    }
}

#[derive(Debug)]
enum Transition {
    Tick,
    Weather(ExtractedWeather),
    SetAngle {
        axis: Axis,
        degrees: f64,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Toggle {
        toggle: Toggle,
        reply: oneshot::Sender<bool>,
    },
    RequestAudit {
        identity: String,
        reply: oneshot::Sender<AuditRequest>,
    },
}

/// Single writer of [`SystemState`]. Transitions are applied in arrival order.
struct StateOwner {
    state: Arc<SystemState>,
    sim: TelemetrySimulator,
    state_tx: watch::Sender<Arc<SystemState>>,
    audit_tx: watch::Sender<AuditState>,
    audits: JoinSet<(String, AuditOutcome)>,
    oracle: Arc<dyn TextOracle>,
    location: String,
    web_search: bool,
    metrics: Option<ControllerMetrics>,
}

impl StateOwner {
    async fn run(
        mut self,
        mut transitions: mpsc::Receiver<Transition>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("state owner shutdown signal received");
                    break;
                }
                transition = transitions.recv() => match transition {
                    Some(transition) => self.apply(transition),
                    None => break,
                },
                Some(joined) = self.audits.join_next(), if !self.audits.is_empty() => {
                    match joined {
                        Ok((requested_by, outcome)) => self.finish_audit(requested_by, outcome),
                        Err(err) => {
                            warn!(error = %err, "audit task failed");
                            let requested_by = match &*self.audit_tx.borrow() {
                                AuditState::Pending { requested_by } => requested_by.clone(),
                                _ => String::new(),
                            };
                            self.finish_audit(
                                requested_by,
                                AuditOutcome {
                                    text: AUDIT_FALLBACK.to_owned(),
                                    fallback: true,
                                },
                            );
                        }
                    }
                }
            }
        }
        self.audits.abort_all();
        Ok(())
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Tick => {
                let applied = !self.state.is_shut_down;
                let next = telemetry::tick(&self.state, &mut self.sim);
                if let Some(metrics) = &self.metrics {
                    metrics.record_tick(applied);
                }
                self.publish(next);
            }
            Transition::Weather(report) => {
                let next = weather::apply_report(&self.state, &report);
                if report.hazard && !self.state.is_shut_down {
                    warn!(status = %report.status, "weather hazard detected, protective shutdown latched");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_hazard_shutdown();
                    }
                } else if !report.hazard && self.state.weather.hazard_detected && next.is_shut_down {
                    info!("weather hazard cleared, shutdown remains until resumed");
                }
                self.publish(next);
            }
            Transition::SetAngle {
                axis,
                degrees,
                reply,
            } => {
                let (next, outcome) = safety::set_angle(&self.state, axis, degrees);
                let label = match outcome {
                    CommandOutcome::Applied => {
                        debug!(axis = ?axis, degrees, "manual angle applied");
                        "applied".to_owned()
                    }
                    CommandOutcome::Rejected(reason) => {
                        debug!(axis = ?axis, degrees, reason = reason.as_str(), "manual angle rejected");
                        format!("rejected_{}", reason.as_str())
                    }
                };
                self.record_command("set_angle", &label);
                self.publish(next);
                let _ = reply.send(outcome);
            }
            Transition::Toggle { toggle, reply } => {
                let next = match toggle {
                    Toggle::ChildLock => safety::toggle_child_lock(&self.state),
                    Toggle::AutoTrack => safety::toggle_auto_track(&self.state),
                    Toggle::Shutdown => safety::toggle_shutdown(&self.state),
                };
                let value = match toggle {
                    Toggle::ChildLock => next.child_lock,
                    Toggle::AutoTrack => next.auto_track_enabled,
                    Toggle::Shutdown => next.is_shut_down,
                };
                info!(command = toggle.command(), value, "operator toggle");
                self.record_command(toggle.command(), "applied");
                self.publish(next);
                let _ = reply.send(value);
            }
            Transition::RequestAudit { identity, reply } => {
                let pending = self.audit_tx.borrow().is_pending();
                let answer = if pending {
                    debug!(requested_by = %identity, "audit already pending, request coalesced");
                    AuditRequest::AlreadyPending
                } else {
                    self.start_audit(identity);
                    AuditRequest::Started
                };
                let label = match answer {
                    AuditRequest::Started => "started",
                    AuditRequest::AlreadyPending => "coalesced",
                };
                self.record_command("request_audit", label);
                let _ = reply.send(answer);
            }
        }
    }

    /// Replace the current snapshot. Unchanged states are not republished.
    fn publish(&mut self, next: SystemState) {
        if next == *self.state {
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_shut_down(next.is_shut_down);
        }
        self.state = Arc::new(next);
        self.state_tx.send_replace(Arc::clone(&self.state));
    }

    fn start_audit(&mut self, identity: String) {
        info!(requested_by = %identity, "audit requested");
        self.audit_tx.send_replace(AuditState::Pending {
            requested_by: identity.clone(),
        });
        let oracle = Arc::clone(&self.oracle);
        let snapshot = Arc::clone(&self.state);
        let location = self.location.clone();
        let web_search = self.web_search;
        self.audits.spawn(async move {
            let outcome =
                run_audit(oracle.as_ref(), &snapshot, &identity, &location, web_search).await;
            (identity, outcome)
        });
    }

    fn finish_audit(&mut self, requested_by: String, outcome: AuditOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_audit(if outcome.fallback { "fallback" } else { "ok" });
        }
        info!(requested_by = %requested_by, fallback = outcome.fallback, "audit completed");
        self.audit_tx.send_replace(AuditState::Ready {
            requested_by,
            text: outcome.text,
            fallback: outcome.fallback,
            completed_at: Utc::now(),
        });
    }

    fn record_command(&self, command: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_command(command, outcome);
        }
    }
}

async fn run_telemetry(
    period: Duration,
    transitions: mpsc::Sender<Transition>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut limiter = RateLimiter::delayed(period);
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = limiter.tick() => {
                if transitions.send(Transition::Tick).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("telemetry ticker stopped");
    Ok(())
}

async fn run_weather(
    monitor: WeatherMonitor,
    period: Duration,
    transitions: mpsc::Sender<Transition>,
    metrics: Option<ControllerMetrics>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut limiter = RateLimiter::new(period);
    'poll: loop {
        tokio::select! {
            _ = shutdown.recv() => break 'poll,
            _ = limiter.tick() => {}
        }
        let result = tokio::select! {
            _ = shutdown.recv() => break 'poll,
            result = monitor.poll() => result,
        };
        match result {
            Ok(report) => {
                if let Some(metrics) = &metrics {
                    metrics.record_weather_poll(if report.hazard { "hazard" } else { "clear" });
                }
                if transitions.send(Transition::Weather(report)).await.is_err() {
                    break 'poll;
                }
            }
            Err(err) => {
                if let Some(metrics) = &metrics {
                    metrics.record_weather_poll("failed");
                }
                warn!(error = %err, "weather poll failed, keeping previous report");
            }
        }
    }
    debug!("weather monitor stopped");
    Ok(())
}
