//! ---
//! ldhrs_section: "11-simulation"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Telemetry tick transition."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use ldhrs_sim::TelemetrySimulator;

use crate::state::SystemState;

/// One telemetry step.
///
/// A stowed array is left exactly as it was. Otherwise telemetry always walks
/// and the angles walk only under auto-track.
pub fn tick(state: &SystemState, sim: &mut TelemetrySimulator) -> SystemState {
    if state.is_shut_down {
        return state.clone();
    }
    let telemetry = sim.step_frame(&state.telemetry);
    let axis = if state.auto_track_enabled {
        sim.step_axis(state.axis)
    } else {
        state.axis
    };
    SystemState {
        telemetry,
        axis,
        ..state.clone()
    }
}
