//! Synthetic observations generated from the reference model.
//!
//! Used to check that a fit recovers a known coefficient, optionally with
//! Gaussian measurement noise on every observable.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::model::{SimulationLimits, TrajectoryModel};
use crate::quadratic_drag::QuadraticDragModel;
use crate::shell::BallisticDataPoint;

/// Relative measurement noise: each observable is scaled by a Normal(1, σ) draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationNoise {
    pub relative_std: f64,
}

/// Fly the reference at each elevation and record what it did.
pub fn synthesize_data_points(
    reference: &QuadraticDragModel,
    v0: f64,
    elevations_rad: &[f64],
    limits: &SimulationLimits,
) -> Result<Vec<BallisticDataPoint>> {
    elevations_rad
        .iter()
        .map(|&elevation| {
            let traj = reference.simulate(v0, elevation, limits);
            let summary = traj.summary().ok_or(CalibrationError::DegenerateTrajectory {
                samples: traj.len(),
            })?;
            Ok(BallisticDataPoint::new(
                elevation,
                summary.range,
                summary.time_of_flight,
                summary.impact_velocity,
            )
            .with_max_height(summary.max_height))
        })
        .collect()
}

/// Same as `synthesize_data_points` with noise applied to range, time,
/// impact velocity and max height.
pub fn synthesize_noisy_data_points<R: Rng + ?Sized>(
    reference: &QuadraticDragModel,
    v0: f64,
    elevations_rad: &[f64],
    limits: &SimulationLimits,
    noise: ObservationNoise,
    rng: &mut R,
) -> Result<Vec<BallisticDataPoint>> {
    let factor_dist = Normal::new(1.0, noise.relative_std).map_err(|_| {
        CalibrationError::InvalidParameter {
            name: "observation noise",
            value: noise.relative_std,
        }
    })?;

    let mut points = synthesize_data_points(reference, v0, elevations_rad, limits)?;
    for dp in &mut points {
        dp.range *= factor_dist.sample(rng).max(0.0);
        dp.time *= factor_dist.sample(rng).max(0.0);
        dp.impact_velocity *= factor_dist.sample(rng).max(0.0);
        dp.max_height *= factor_dist.sample(rng).max(0.0);
    }
    Ok(points)
}
