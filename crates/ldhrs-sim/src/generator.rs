//! ---
//! ldhrs_section: "11-simulation"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Simulation runtime helpers and random-walk engines."
//! ldhrs_version: "v0.1.0"
//! ldhrs_owner: "tbd"
//! ---
use ldhrs_common::config::{ANGLE_MAX, LDR_MAX};
use rand::prelude::*;
use rand_distr::Uniform;

use crate::frames::{AxisPosition, LdrReadings, TelemetryFrame};

/// Half-width of the symmetric uniform step applied to each reading per tick.
///
/// LDR channels are integer counts, so their step is drawn from the integers
/// `-ldr..=ldr` and the walk has no drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSteps {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub ldr: u16,
    pub angle: f64,
}

impl Default for WalkSteps {
    fn default() -> Self {
        Self {
            voltage: 0.1,
            current: 0.05,
            temperature: 0.1,
            ldr: 10,
            angle: 1.0,
        }
    }
}

/// Seeded random-walk generator for telemetry and auto-track angles.
#[derive(Debug)]
pub struct TelemetrySimulator {
    rng: StdRng,
    steps: WalkSteps,
    voltage: Uniform<f64>,
    current: Uniform<f64>,
    temperature: Uniform<f64>,
    ldr: Uniform<i32>,
    angle: Uniform<f64>,
}

impl TelemetrySimulator {
    /// Build a simulator; without a seed the generator is seeded from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_steps(seed, WalkSteps::default())
    }

    pub fn with_steps(seed: Option<u64>, steps: WalkSteps) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            steps,
            voltage: symmetric(steps.voltage),
            current: symmetric(steps.current),
            temperature: symmetric(steps.temperature),
            ldr: Uniform::new_inclusive(-i32::from(steps.ldr), i32::from(steps.ldr)),
            angle: symmetric(steps.angle),
        }
    }

    pub fn steps(&self) -> WalkSteps {
        self.steps
    }

    /// Advance voltage, current, temperature and the four LDR channels by one step.
    pub fn step_frame(&mut self, frame: &TelemetryFrame) -> TelemetryFrame {
        let voltage = round_to(frame.voltage + self.voltage.sample(&mut self.rng), 2);
        let current = round_to(frame.current + self.current.sample(&mut self.rng), 2);
        let temperature = round_to(
            frame.temperature + self.temperature.sample(&mut self.rng),
            1,
        );
        let ldr = LdrReadings {
            top: self.step_ldr(frame.ldr.top),
            bottom: self.step_ldr(frame.ldr.bottom),
            left: self.step_ldr(frame.ldr.left),
            right: self.step_ldr(frame.ldr.right),
        };
        TelemetryFrame {
            voltage,
            current,
            temperature,
            ldr,
        }
    }

    /// Advance both actuator angles by one step, clamped to `0..=180`.
    pub fn step_axis(&mut self, axis: AxisPosition) -> AxisPosition {
        let x = (axis.x + self.angle.sample(&mut self.rng)).clamp(0.0, ANGLE_MAX);
        let y = (axis.y + self.angle.sample(&mut self.rng)).clamp(0.0, ANGLE_MAX);
        AxisPosition { x, y }
    }

    fn step_ldr(&mut self, value: u16) -> u16 {
        let next = i32::from(value) + self.ldr.sample(&mut self.rng);
        next.clamp(0, i32::from(LDR_MAX)) as u16
    }
}

fn symmetric(half_width: f64) -> Uniform<f64> {
    let half_width = if half_width.is_finite() {
        half_width.abs()
    } else {
        0.0
    };
    Uniform::new_inclusive(-half_width, half_width)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> TelemetryFrame {
        TelemetryFrame {
            voltage: 18.4,
            current: 4.2,
            temperature: 34.0,
            ldr: LdrReadings::new(850, 840, 820, 830),
        }
    }

    #[test]
    fn steps_stay_within_half_width() {
        let mut sim = TelemetrySimulator::new(Some(42));
        let start = frame();
        for _ in 0..500 {
            let next = sim.step_frame(&start);
            assert!((next.voltage - start.voltage).abs() <= 0.1 + 0.005);
            assert!((next.current - start.current).abs() <= 0.05 + 0.005);
            assert!((next.temperature - start.temperature).abs() <= 0.1 + 0.05);
            for (before, after) in start.ldr.channels().iter().zip(next.ldr.channels()) {
                assert!((i32::from(*before) - i32::from(after)).abs() <= 10);
            }
        }
    }

    #[test]
    fn same_seed_produces_same_walk() {
        let mut a = TelemetrySimulator::new(Some(7));
        let mut b = TelemetrySimulator::new(Some(7));
        let mut fa = frame();
        let mut fb = frame();
        for _ in 0..50 {
            fa = a.step_frame(&fa);
            fb = b.step_frame(&fb);
        }
        assert_eq!(fa, fb);
    }

    #[test]
    fn ldr_steps_average_to_zero() {
        let start = frame();
        let mut total: i64 = 0;
        let mut samples: i64 = 0;
        for seed in 0..20 {
            let mut sim = TelemetrySimulator::new(Some(seed));
            for _ in 0..10_000 {
                let next = sim.step_frame(&start);
                for (before, after) in start.ldr.channels().iter().zip(next.ldr.channels()) {
                    total += i64::from(after) - i64::from(*before);
                    samples += 1;
                }
            }
        }
        let mean = total as f64 / samples as f64;
        assert!(mean.abs() < 0.1, "mean ldr step {mean}");
    }

    #[test]
    fn ldr_walk_does_not_sink_over_an_hour() {
        let mut means = Vec::new();
        for seed in 0..32 {
            let mut sim = TelemetrySimulator::new(Some(seed));
            let mut current = frame();
            for _ in 0..1_800 {
                current = sim.step_frame(&current);
            }
            let sum: u32 = current.ldr.channels().iter().map(|v| u32::from(*v)).sum();
            means.push(f64::from(sum) / 4.0);
        }
        let average = means.iter().sum::<f64>() / means.len() as f64;
        assert!(average > 600.0, "ldr channels sank to {average}");
    }

    #[test]
    fn ldr_walk_is_clamped_at_both_ends() {
        let mut sim = TelemetrySimulator::with_steps(
            Some(3),
            WalkSteps {
                ldr: 400,
                ..WalkSteps::default()
            },
        );
        let mut current = TelemetryFrame {
            ldr: LdrReadings::new(0, 1024, 5, 1020),
            ..frame()
        };
        for _ in 0..1_000 {
            current = sim.step_frame(&current);
            assert!(current.ldr.is_within_range());
        }
    }

    #[test]
    fn angle_walk_is_clamped() {
        let mut sim = TelemetrySimulator::with_steps(
            Some(11),
            WalkSteps {
                angle: 50.0,
                ..WalkSteps::default()
            },
        );
        let mut axis = AxisPosition::new(0.0, 180.0);
        for _ in 0..1_000 {
            axis = sim.step_axis(axis);
            assert!((0.0..=180.0).contains(&axis.x));
            assert!((0.0..=180.0).contains(&axis.y));
        }
    }

    #[test]
    fn zero_width_steps_hold_values() {
        let mut sim = TelemetrySimulator::with_steps(
            Some(1),
            WalkSteps {
                voltage: 0.0,
                current: 0.0,
                temperature: 0.0,
                ldr: 0,
                angle: 0.0,
            },
        );
        let start = frame();
        assert_eq!(sim.step_frame(&start), start);
        let axis = AxisPosition::new(12.0, 34.0);
        assert_eq!(sim.step_axis(axis), axis);
    }
}
