//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Shared primitives and utilities for the controller runtime."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

pub const LDR_MAX: u16 = 1024;
pub const ANGLE_MAX: f64 = 180.0;
pub const PERCENT_MAX: u8 = 100;

fn default_telemetry_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_weather_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_location() -> String {
    "Faisalabad, Punjab, Pakistan".to_owned()
}

fn default_sentinel() -> String {
    "STORM_WARNING_SHUTDOWN".to_owned()
}

fn default_hazard_keywords() -> Vec<String> {
    vec!["storm".to_owned(), "heavy rain".to_owned()]
}

fn default_oracle_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_owned()
}

fn default_oracle_model() -> String {
    "gemini-3-flash-preview".to_owned()
}

fn default_api_key_env() -> String {
    "LDHRS_ORACLE_API_KEY".to_owned()
}

fn default_oracle_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_true() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

/// Primary configuration object for the LDHRS controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "LDHRS_CONFIG";

    /// Load configuration from disk, respecting the `LDHRS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `LDHRS_CONFIG` path must exist. When none of the candidates
    /// exist the built-in defaults are used and `source` is `None`.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;
        self.weather.validate(&self.controller)?;
        self.oracle.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Cadence and seed values for the telemetry loop.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_telemetry_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub telemetry_interval_ms: Duration,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub initial: InitialStateConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: default_telemetry_interval(),
            random_seed: None,
            initial: InitialStateConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.telemetry_interval_ms.is_zero() {
            return Err(anyhow!("controller.telemetry_interval_ms must be positive"));
        }
        self.initial.validate()
    }
}

/// Seed values applied when the controller starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialStateConfig {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub battery: u8,
    pub dust: u8,
    pub ldr_top: u16,
    pub ldr_bottom: u16,
    pub ldr_left: u16,
    pub ldr_right: u16,
    pub angle_x: f64,
    pub angle_y: f64,
    pub auto_track: bool,
    pub child_lock: bool,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            voltage: 18.4,
            current: 4.2,
            temperature: 34.0,
            battery: 88,
            dust: 12,
            ldr_top: 850,
            ldr_bottom: 840,
            ldr_left: 820,
            ldr_right: 830,
            angle_x: 90.0,
            angle_y: 45.0,
            auto_track: true,
            child_lock: false,
        }
    }
}

impl InitialStateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.battery > PERCENT_MAX || self.dust > PERCENT_MAX {
            return Err(anyhow!("initial battery and dust must be within 0..=100"));
        }
        let ldr = [self.ldr_top, self.ldr_bottom, self.ldr_left, self.ldr_right];
        if ldr.iter().any(|value| *value > LDR_MAX) {
            return Err(anyhow!("initial ldr channels must be within 0..={}", LDR_MAX));
        }
        for (axis, angle) in [("x", self.angle_x), ("y", self.angle_y)] {
            if !(0.0..=ANGLE_MAX).contains(&angle) {
                return Err(anyhow!(
                    "initial angle_{} must be within 0..={}",
                    axis,
                    ANGLE_MAX
                ));
            }
        }
        for (name, value) in [
            ("voltage", self.voltage),
            ("current", self.current),
            ("temperature", self.temperature),
        ] {
            if !value.is_finite() {
                return Err(anyhow!("initial {} must be a finite number", name));
            }
        }
        Ok(())
    }
}

/// Settings for the periodic hazard poll.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub poll_interval_secs: Duration,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    #[serde(default = "default_hazard_keywords")]
    pub hazard_keywords: Vec<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_weather_interval(),
            location: default_location(),
            sentinel: default_sentinel(),
            hazard_keywords: default_hazard_keywords(),
        }
    }
}

impl WeatherConfig {
    pub fn validate(&self, controller: &ControllerConfig) -> Result<()> {
        if self.poll_interval_secs.is_zero() {
            return Err(anyhow!("weather.poll_interval_secs must be positive"));
        }
        if self.poll_interval_secs < controller.telemetry_interval_ms {
            return Err(anyhow!(
                "weather.poll_interval_secs must not be shorter than the telemetry interval"
            ));
        }
        if self.sentinel.trim().is_empty() {
            return Err(anyhow!("weather.sentinel must not be empty"));
        }
        if self.hazard_keywords.iter().any(|kw| kw.trim().is_empty()) {
            return Err(anyhow!("weather.hazard_keywords must not contain blank entries"));
        }
        Ok(())
    }
}

/// Which text-generation backend the controller talks to.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    #[default]
    Http,
    Offline,
}

impl std::str::FromStr for OracleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(OracleMode::Http),
            "offline" => Ok(OracleMode::Offline),
            other => Err(format!("unknown oracle mode: {}", other)),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub mode: OracleMode,
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_oracle_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout_secs: Duration,
    /// Ask the backend to ground hazard polls with web search.
    #[serde(default = "default_true")]
    pub web_search: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::default(),
            endpoint: default_oracle_endpoint(),
            model: default_oracle_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_oracle_timeout(),
            web_search: true,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> Result<()> {
        if matches!(self.mode, OracleMode::Http) {
            let url = Url::parse(&self.endpoint)
                .with_context(|| format!("oracle.endpoint {} is not a valid URL", self.endpoint))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow!("oracle.endpoint must use http or https"));
            }
            if self.model.trim().is_empty() {
                return Err(anyhow!("oracle.model must not be empty"));
            }
        }
        if self.timeout_secs.is_zero() {
            return Err(anyhow!("oracle.timeout_secs must be positive"));
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}
