//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Controller state model."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use ldhrs_common::config::{InitialStateConfig, PERCENT_MAX};
use ldhrs_sim::{AxisPosition, LdrReadings, TelemetryFrame};
use serde::{Deserialize, Serialize};

/// Last known external hazard report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherStatus {
    pub status_text: String,
    pub temperature_text: String,
    pub condition_text: String,
    pub hazard_detected: bool,
}

/// Full controller state. Transitions never edit a published value; they build
/// the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub telemetry: TelemetryFrame,
    /// Percent, `0..=100`.
    pub battery: u8,
    /// Percent, `0..=100`.
    pub dust: u8,
    pub axis: AxisPosition,
    pub auto_track_enabled: bool,
    pub child_lock: bool,
    pub is_shut_down: bool,
    pub weather: WeatherStatus,
}

impl SystemState {
    pub fn from_config(initial: &InitialStateConfig) -> Self {
        Self {
            telemetry: TelemetryFrame {
                voltage: initial.voltage,
                current: initial.current,
                temperature: initial.temperature,
                ldr: LdrReadings::new(
                    initial.ldr_top,
                    initial.ldr_bottom,
                    initial.ldr_left,
                    initial.ldr_right,
                ),
            },
            battery: initial.battery.min(PERCENT_MAX),
            dust: initial.dust.min(PERCENT_MAX),
            axis: AxisPosition::new(initial.angle_x, initial.angle_y),
            auto_track_enabled: initial.auto_track,
            child_lock: initial.child_lock,
            is_shut_down: false,
            weather: WeatherStatus::default(),
        }
    }

    pub fn with_dust(self, dust: u8) -> Self {
        Self {
            dust: dust.min(PERCENT_MAX),
            ..self
        }
    }

    pub fn with_battery(self, battery: u8) -> Self {
        Self {
            battery: battery.min(PERCENT_MAX),
            ..self
        }
    }

    /// True when every bounded field sits inside its declared range.
    pub fn within_bounds(&self) -> bool {
        self.telemetry.ldr.is_within_range()
            && (0.0..=180.0).contains(&self.axis.x)
            && (0.0..=180.0).contains(&self.axis.y)
            && self.battery <= PERCENT_MAX
            && self.dust <= PERCENT_MAX
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::from_config(&InitialStateConfig::default())
    }
}
