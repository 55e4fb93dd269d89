//! ---
//! ldhrs_section: "03-persistence-logging"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Metrics collection and export utilities."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain"),
                )],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "ldhrsd_starts_total",
            "Total number of times the LDHRS daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ldhrsd_config_load_seconds",
                "Time spent loading and validating configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new("ldhrsd_build_info", "Build metadata for the running daemon"),
            &["version", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, profile])
            .set(1.0);
    }
}

/// Counters describing the controller's state transitions.
#[derive(Clone, Debug)]
pub struct ControllerMetrics {
    telemetry_ticks: IntCounterVec,
    weather_polls: IntCounterVec,
    hazard_shutdowns: IntCounter,
    commands: IntCounterVec,
    audits: IntCounterVec,
    shut_down: IntGauge,
}

impl ControllerMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let telemetry_ticks = IntCounterVec::new(
            Opts::new(
                "ldhrs_telemetry_ticks_total",
                "Telemetry ticks by outcome (applied or skipped while shut down)",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(telemetry_ticks.clone()))?;

        let weather_polls = IntCounterVec::new(
            Opts::new(
                "ldhrs_weather_polls_total",
                "Weather hazard polls by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(weather_polls.clone()))?;

        let hazard_shutdowns = IntCounter::with_opts(Opts::new(
            "ldhrs_hazard_shutdowns_total",
            "Emergency stows forced by a weather hazard report",
        ))?;
        registry.register(Box::new(hazard_shutdowns.clone()))?;

        let commands = IntCounterVec::new(
            Opts::new("ldhrs_commands_total", "Operator commands by kind and outcome"),
            &["command", "outcome"],
        )?;
        registry.register(Box::new(commands.clone()))?;

        let audits = IntCounterVec::new(
            Opts::new("ldhrs_audits_total", "Audit requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(audits.clone()))?;

        let shut_down = IntGauge::with_opts(Opts::new(
            "ldhrs_shutdown_active",
            "Indicator (0/1) whether the array is currently stowed",
        ))?;
        registry.register(Box::new(shut_down.clone()))?;

        Ok(Self {
            telemetry_ticks,
            weather_polls,
            hazard_shutdowns,
            commands,
            audits,
            shut_down,
        })
    }

    pub fn record_tick(&self, applied: bool) {
        let outcome = if applied { "applied" } else { "skipped" };
        self.telemetry_ticks.with_label_values(&[outcome]).inc();
    }

    pub fn record_weather_poll(&self, outcome: &str) {
        self.weather_polls.with_label_values(&[outcome]).inc();
    }

    pub fn record_hazard_shutdown(&self) {
        self.hazard_shutdowns.inc();
    }

    pub fn record_command(&self, command: &str, outcome: &str) {
        self.commands.with_label_values(&[command, outcome]).inc();
    }

    pub fn record_audit(&self, outcome: &str) {
        self.audits.with_label_values(&[outcome]).inc();
    }

    pub fn set_shut_down(&self, shut_down: bool) {
        self.shut_down.set(i64::from(shut_down));
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(registry: &Registry, name: &str, label: Option<(&str, &str)>) -> f64 {
        registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)
            .and_then(|family| {
                family
                    .get_metric()
                    .iter()
                    .find(|metric| match label {
                        Some((key, value)) => metric
                            .get_label()
                            .iter()
                            .any(|pair| pair.get_name() == key && pair.get_value() == value),
                        None => true,
                    })
                    .map(|metric| metric.get_counter().get_value())
            })
            .unwrap_or_default()
    }

    #[test]
    fn controller_metrics_register_and_count() {
        let registry = new_registry();
        let metrics = ControllerMetrics::new(registry.clone()).unwrap();
        metrics.record_tick(true);
        metrics.record_tick(true);
        metrics.record_tick(false);
        metrics.record_hazard_shutdown();
        metrics.record_command("set_angle", "rejected_auto_track");

        assert_eq!(
            counter_value(&registry, "ldhrs_telemetry_ticks_total", Some(("outcome", "applied"))),
            2.0
        );
        assert_eq!(
            counter_value(&registry, "ldhrs_telemetry_ticks_total", Some(("outcome", "skipped"))),
            1.0
        );
        assert_eq!(
            counter_value(&registry, "ldhrs_hazard_shutdowns_total", None),
            1.0
        );
        assert_eq!(
            counter_value(&registry, "ldhrs_commands_total", Some(("command", "set_angle"))),
            1.0
        );
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = new_registry();
        ControllerMetrics::new(registry.clone()).unwrap();
        assert!(ControllerMetrics::new(registry).is_err());
    }

    #[tokio::test]
    async fn exporter_binds_ephemeral_port_and_shuts_down() {
        let registry = new_registry();
        DaemonMetrics::new(registry.clone()).unwrap().inc_start();
        let server = spawn_http_server(registry, SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        assert_ne!(server.addr().port(), 0);
        server.shutdown().await.unwrap();
    }
}
