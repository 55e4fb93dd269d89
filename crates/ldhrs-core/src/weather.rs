//! ---
//! ldhrs_section: "03-weather-monitor"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Weather hazard polling and free-text extraction."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Weather monitor.
//!
//! The oracle answers in free text. [`HazardExtractor::extract`] pulls out a
//! hazard flag, a display line and best-effort temperature/condition fragments.
//! It never fails; fields it cannot find are left as `None` and the previous
//! values survive in [`apply_report`].

use std::sync::Arc;

use ldhrs_common::config::WeatherConfig;
use ldhrs_oracle::{OracleError, OracleRequest, RequestPurpose, TextOracle};
use tracing::debug;

use crate::state::{SystemState, WeatherStatus};

/// Replacement shown in place of the sentinel token.
pub const HAZARD_BANNER: &str = "EXTREME WEATHER ALERT!";

const TEMPERATURE_SUFFIX: &str = "°C";
const CONDITION_MARKER: &str = "Condition is ";

/// Fields recovered from a single oracle reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedWeather {
    pub hazard: bool,
    pub status: String,
    pub temperature: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HazardExtractor {
    sentinel: String,
    keywords: Vec<String>,
}

impl HazardExtractor {
    pub fn new(sentinel: impl Into<String>, keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            keywords: keywords
                .into_iter()
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(config.sentinel.clone(), config.hazard_keywords.iter().cloned())
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn extract(&self, text: &str) -> ExtractedWeather {
        let lowered = text.to_lowercase();
        let hazard = (!self.sentinel.is_empty() && text.contains(&self.sentinel))
            || self.keywords.iter().any(|kw| lowered.contains(kw.as_str()));
        let status = if self.sentinel.is_empty() {
            text.trim().to_owned()
        } else {
            text.replace(&self.sentinel, HAZARD_BANNER).trim().to_owned()
        };
        ExtractedWeather {
            hazard,
            status,
            temperature: extract_temperature(text),
            condition: extract_condition(text),
        }
    }
}

/// First run of digits (optionally negative) directly followed by `°C`.
fn extract_temperature(text: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find(TEMPERATURE_SUFFIX) {
        let end = search_from + found;
        let head = &text[..end];
        let digits = head
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(idx, _)| idx);
        if let Some(start) = digits {
            let start = if head[..start].ends_with('-') {
                start - 1
            } else {
                start
            };
            return Some(format!("{}{}", &head[start..], TEMPERATURE_SUFFIX));
        }
        search_from = end + TEMPERATURE_SUFFIX.len();
    }
    None
}

fn extract_condition(text: &str) -> Option<String> {
    let start = text.find(CONDITION_MARKER)? + CONDITION_MARKER.len();
    let rest = &text[start..];
    let condition = rest.split('.').next().unwrap_or(rest).trim();
    (!condition.is_empty()).then(|| condition.to_owned())
}

/// Fold a report into state.
///
/// A hazard latches `is_shut_down`. A clear report drops the hazard flag and
/// leaves `is_shut_down` alone.
pub fn apply_report(state: &SystemState, report: &ExtractedWeather) -> SystemState {
    let previous = &state.weather;
    let weather = WeatherStatus {
        status_text: if report.status.is_empty() {
            previous.status_text.clone()
        } else {
            report.status.clone()
        },
        temperature_text: report
            .temperature
            .clone()
            .unwrap_or_else(|| previous.temperature_text.clone()),
        condition_text: report
            .condition
            .clone()
            .unwrap_or_else(|| previous.condition_text.clone()),
        hazard_detected: report.hazard,
    };
    SystemState {
        is_shut_down: state.is_shut_down || report.hazard,
        weather,
        ..state.clone()
    }
}

pub fn weather_prompt(location: &str, sentinel: &str) -> String {
    format!(
        "Search for the current weather in {location}. Reply with exactly one line in the \
format: \"Current temperature is X°C. Condition is Y. Summary: Z\". If there is any storm, \
heavy rain, high wind or other severe weather warning that threatens an outdoor solar \
tracker, include the token {sentinel} in the reply."
    )
}

/// Periodic hazard poller. One call to [`WeatherMonitor::poll`] is one oracle round trip.
#[derive(Debug, Clone)]
pub struct WeatherMonitor {
    oracle: Arc<dyn TextOracle>,
    extractor: HazardExtractor,
    prompt: String,
    web_search: bool,
}

impl WeatherMonitor {
    pub fn new(oracle: Arc<dyn TextOracle>, config: &WeatherConfig, web_search: bool) -> Self {
        let extractor = HazardExtractor::from_config(config);
        let prompt = weather_prompt(&config.location, extractor.sentinel());
        Self {
            oracle,
            extractor,
            prompt,
            web_search,
        }
    }

    pub fn extractor(&self) -> &HazardExtractor {
        &self.extractor
    }

    pub async fn poll(&self) -> Result<ExtractedWeather, OracleError> {
        let request = OracleRequest::new(self.prompt.clone())
            .with_web_search(self.web_search)
            .with_purpose(RequestPurpose::Weather);
        let text = self.oracle.generate(request).await?;
        let report = self.extractor.extract(&text);
        debug!(hazard = report.hazard, status = %report.status, "weather report extracted");
        Ok(report)
    }
}
