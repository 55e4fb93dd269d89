//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Telemetry and safety controller lifecycle."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Telemetry & safety controller for the LDHRS solar tracker.
//!
//! A single owner task holds [`SystemState`] and applies transitions one at a
//! time: simulator ticks, weather hazard reports, and operator commands.
//! Every accepted transition publishes a fresh immutable snapshot.

pub mod audit;
pub mod controller;
pub mod error;
pub mod safety;
pub mod state;
pub mod telemetry;
pub mod weather;

pub use audit::{AuditRequest, AuditState, AUDIT_FALLBACK};
pub use controller::{ControllerClient, ControllerHandle, TelemetryController};
pub use error::ControllerError;
pub use safety::{CommandOutcome, InterlockReason, SafetyView, ShutdownReason};
pub use state::{SystemState, WeatherStatus};
pub use weather::{ExtractedWeather, HazardExtractor, WeatherMonitor};

pub use ldhrs_sim::{Axis, AxisPosition, LdrReadings, TelemetryFrame};
