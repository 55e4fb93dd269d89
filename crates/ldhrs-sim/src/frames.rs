//! ---
//! ldhrs_section: "11-simulation"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Sensor frame types shared by the simulator and controller."
//! ldhrs_version: "v0.1.0"
//! ldhrs_owner: "tbd"
//! ---
use ldhrs_common::config::{ANGLE_MAX, LDR_MAX};
use serde::{Deserialize, Serialize};

/// Four-channel light-dependent resistor readings, each within `0..=1024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdrReadings {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl LdrReadings {
    pub fn new(top: u16, bottom: u16, left: u16, right: u16) -> Self {
        Self {
            top: clamp_ldr(top),
            bottom: clamp_ldr(bottom),
            left: clamp_ldr(left),
            right: clamp_ldr(right),
        }
    }

    pub fn channels(&self) -> [u16; 4] {
        [self.top, self.bottom, self.left, self.right]
    }

    pub fn is_within_range(&self) -> bool {
        self.channels().iter().all(|value| *value <= LDR_MAX)
    }
}

fn clamp_ldr(value: u16) -> u16 {
    value.min(LDR_MAX)
}

/// Electrical and optical readings advanced on every telemetry tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub ldr: LdrReadings,
}

/// Actuator axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            other => Err(format!("unknown axis: {}", other)),
        }
    }
}

/// Commanded actuator angles, each within `0..=180` degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPosition {
    pub x: f64,
    pub y: f64,
}

impl AxisPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_angle(x),
            y: clamp_angle(y),
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Copy with one axis replaced; the value is clamped to the mechanical range.
    pub fn with(self, axis: Axis, degrees: f64) -> Self {
        let degrees = clamp_angle(degrees);
        match axis {
            Axis::X => Self { x: degrees, ..self },
            Axis::Y => Self { y: degrees, ..self },
        }
    }
}

/// Clamp to `0..=180`. NaN collapses to `0`.
pub fn clamp_angle(degrees: f64) -> f64 {
    if degrees.is_nan() {
        return 0.0;
    }
    degrees.clamp(0.0, ANGLE_MAX)
}
