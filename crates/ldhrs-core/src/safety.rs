//! ---
//! ldhrs_section: "02-safety-interlocks"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Interlocks, advisories, and operator command transitions."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Safety policy.
//!
//! Everything here is a pure function of a [`SystemState`]. Operator commands
//! return the next state rather than mutating the current one.
//!
//! ## Interlock precedence
//!
//! A manual angle command is accepted only when the array is running, unlocked
//! and in manual mode. When several interlocks hold at once the reported reason
//! is the strongest one: shutdown, then child lock, then auto-track.

use std::fmt;

use ldhrs_sim::Axis;
use serde::{Deserialize, Serialize};

use crate::state::SystemState;

/// Dust percentage above which a cleaning cycle is advised.
pub const CLEANING_DUST_THRESHOLD: u8 = 15;

/// Why a manual angle command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterlockReason {
    ShutDown,
    ChildLock,
    AutoTrack,
}

impl InterlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterlockReason::ShutDown => "shut_down",
            InterlockReason::ChildLock => "child_lock",
            InterlockReason::AutoTrack => "auto_track",
        }
    }
}

impl fmt::Display for InterlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let banner = match self {
            InterlockReason::ShutDown => "PROTECTIVE SHUTDOWN",
            InterlockReason::ChildLock => "LOCKED",
            InterlockReason::AutoTrack => "AUTO TRACKING",
        };
        f.write_str(banner)
    }
}

/// Result of a manual angle command. Rejection is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum CommandOutcome {
    Applied,
    Rejected(InterlockReason),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

/// Why the array is stowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    Weather,
    Manual,
}

pub fn cleaning_advisory(dust: u8) -> bool {
    dust > CLEANING_DUST_THRESHOLD
}

/// `None` when manual angle commands are currently accepted.
pub fn axis_interlock(state: &SystemState) -> Option<InterlockReason> {
    if state.is_shut_down {
        Some(InterlockReason::ShutDown)
    } else if state.child_lock {
        Some(InterlockReason::ChildLock)
    } else if state.auto_track_enabled {
        Some(InterlockReason::AutoTrack)
    } else {
        None
    }
}

pub fn shutdown_reason(state: &SystemState) -> Option<ShutdownReason> {
    if !state.is_shut_down {
        return None;
    }
    if state.weather.hazard_detected {
        Some(ShutdownReason::Weather)
    } else {
        Some(ShutdownReason::Manual)
    }
}

/// Clamp `degrees` to `0..=180` and apply it when no interlock holds.
pub fn set_angle(state: &SystemState, axis: Axis, degrees: f64) -> (SystemState, CommandOutcome) {
    if let Some(reason) = axis_interlock(state) {
        return (state.clone(), CommandOutcome::Rejected(reason));
    }
    let next = SystemState {
        axis: state.axis.with(axis, degrees),
        ..state.clone()
    };
    (next, CommandOutcome::Applied)
}

pub fn toggle_child_lock(state: &SystemState) -> SystemState {
    SystemState {
        child_lock: !state.child_lock,
        ..state.clone()
    }
}

/// Angles are left where they are; only the driver of the next tick changes.
pub fn toggle_auto_track(state: &SystemState) -> SystemState {
    SystemState {
        auto_track_enabled: !state.auto_track_enabled,
        ..state.clone()
    }
}

/// The only way out of a weather-latched stow. The hazard flag is left as reported.
pub fn toggle_shutdown(state: &SystemState) -> SystemState {
    SystemState {
        is_shut_down: !state.is_shut_down,
        ..state.clone()
    }
}

/// Output as reported to the operator: zero while stowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputReadings {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

/// Sun-pointer displacement inferred from the LDR channel imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Derived, presentation-only view of a state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyView {
    pub cleaning_advisory: bool,
    pub axis_interlock: Option<InterlockReason>,
    pub shutdown_reason: Option<ShutdownReason>,
    pub output: OutputReadings,
    pub sun_offset: Option<SunOffset>,
}

impl SafetyView {
    pub fn evaluate(state: &SystemState) -> Self {
        let output = if state.is_shut_down {
            OutputReadings {
                voltage: 0.0,
                current: 0.0,
                power: 0.0,
            }
        } else {
            let voltage = state.telemetry.voltage;
            let current = state.telemetry.current;
            OutputReadings {
                voltage,
                current,
                power: voltage * current,
            }
        };
        let sun_offset = (!state.is_shut_down).then(|| {
            let ldr = state.telemetry.ldr;
            SunOffset {
                dx: (f64::from(ldr.right) - f64::from(ldr.left)) / 6.0,
                dy: (f64::from(ldr.bottom) - f64::from(ldr.top)) / 6.0,
            }
        });
        Self {
            cleaning_advisory: cleaning_advisory(state.dust),
            axis_interlock: axis_interlock(state),
            shutdown_reason: shutdown_reason(state),
            output,
            sun_offset,
        }
    }
}
