//! ---
//! ldhrs_section: "11-simulation"
//! ldhrs_subsection: "01-bootstrap"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Simulation runtime module exports and shared types."
//! ldhrs_version: "v0.1.0"
//! ldhrs_owner: "tbd"
//! ---
//! Simulated sensor readings for the LDHRS tracker.
//!
//! There is no hardware behind these values: each tick nudges every reading by
//! an independent uniform step and clamps it to its sensor range.

pub mod frames;
pub mod generator;

pub use frames::{Axis, AxisPosition, LdrReadings, TelemetryFrame};
pub use generator::{TelemetrySimulator, WalkSteps};
