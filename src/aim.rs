//! Elevation solving on top of any trajectory model.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AIM_ELEVATION_XATOL, AIM_MAX_ITERATIONS, MINIMIZER_MAX_EVALUATIONS, MIN_AIM_ELEVATION,
    ROOT_FINDING_TOLERANCE,
};
use crate::error::{ensure_positive, CalibrationError, Result};
use crate::model::{SimulationLimits, TrajectoryModel};
use crate::optimize::minimize_bounded;

/// Result of an elevation solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimSolution {
    pub elevation_rad: f64,
    pub range: f64,          // meters, interpolated ground crossing
    pub time_of_flight: f64, // seconds
    pub iterations_used: usize,
    pub success: bool,
}

/// Ground range for an elevation, `None` when the model gives nothing usable
fn range_at<M: TrajectoryModel + ?Sized>(
    model: &M,
    v0: f64,
    angle_rad: f64,
    limits: &SimulationLimits,
) -> Option<(f64, f64)> {
    let traj = model.simulate(v0, angle_rad, limits);
    if traj.is_degenerate() {
        return None;
    }
    let range = traj.impact_range()?;
    let time = traj.last()?.t;
    Some((range, time))
}

/// Elevation that maximizes ground range, searched over (0°, 90°).
pub fn max_range_elevation<M: TrajectoryModel + ?Sized>(
    model: &M,
    v0: f64,
    limits: &SimulationLimits,
) -> Result<AimSolution> {
    let v0 = ensure_positive("muzzle velocity", v0)?;

    let result = minimize_bounded(
        |angle| range_at(model, v0, angle, limits).map_or(f64::INFINITY, |(range, _)| -range),
        MIN_AIM_ELEVATION,
        FRAC_PI_2 - MIN_AIM_ELEVATION,
        AIM_ELEVATION_XATOL,
        MINIMIZER_MAX_EVALUATIONS,
    )?;

    let (range, time_of_flight) =
        range_at(model, v0, result.x, limits).ok_or(CalibrationError::NoViableCandidate)?;

    Ok(AimSolution {
        elevation_rad: result.x,
        range,
        time_of_flight,
        iterations_used: result.evaluations,
        success: result.converged,
    })
}

/// Low-trajectory elevation that lands at `target_range`.
///
/// Fails with `RootNotBracketed` when the target lies beyond the model's
/// maximum range.
pub fn elevation_for_range<M: TrajectoryModel + ?Sized>(
    model: &M,
    v0: f64,
    target_range: f64,
    limits: &SimulationLimits,
) -> Result<AimSolution> {
    let target_range = ensure_positive("target range", target_range)?;
    let upper = max_range_elevation(model, v0, limits)?;
    let lower = MIN_AIM_ELEVATION;

    if target_range > upper.range {
        return Err(CalibrationError::RootNotBracketed {
            lower,
            upper: upper.elevation_rad,
        });
    }

    // Failed simulations read as far short of the target
    let range_error = |angle: f64| -> f64 {
        range_at(model, v0, angle, limits).map_or(-target_range, |(range, _)| range - target_range)
    };

    let crossing = solve_elevation(
        range_error,
        lower,
        upper.elevation_rad,
        ROOT_FINDING_TOLERANCE,
        AIM_MAX_ITERATIONS,
    )?;

    let (range, time_of_flight) = range_at(model, v0, crossing.elevation, limits)
        .ok_or(CalibrationError::NoViableCandidate)?;

    Ok(AimSolution {
        elevation_rad: crossing.elevation,
        range,
        time_of_flight,
        iterations_used: crossing.evaluations + upper.iterations_used,
        success: crossing.converged,
    })
}

/// Where the elevation search settled
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Crossing {
    pub elevation: f64,
    pub evaluations: usize,
    pub converged: bool,
}

/// Brent's zeroin on an elevation interval where `range_error` changes sign.
///
/// `b` holds the best estimate and `c` the contrapoint on the other side of
/// the root; each step tries inverse quadratic or secant interpolation and
/// falls back to bisection.
pub(crate) fn solve_elevation<F>(
    range_error: F,
    low: f64,
    high: f64,
    xtol: f64,
    max_evaluations: usize,
) -> Result<Crossing>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (low, high);
    let (mut fa, mut fb) = (range_error(a), range_error(b));
    let mut evaluations = 2;

    if fa.is_nan() || fb.is_nan() || fa * fb > 0.0 {
        return Err(CalibrationError::RootNotBracketed {
            lower: low,
            upper: high,
        });
    }

    let (mut c, mut fc) = (a, fa);
    let mut step = b - a;
    let mut prev_step = step;

    loop {
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * xtol;
        let half = 0.5 * (c - b);
        if half.abs() <= tol || fb == 0.0 {
            return Ok(Crossing {
                elevation: b,
                evaluations,
                converged: true,
            });
        }
        if evaluations >= max_evaluations || fb.is_nan() {
            return Ok(Crossing {
                elevation: b,
                evaluations,
                converged: false,
            });
        }

        if prev_step.abs() < tol || fa.abs() <= fb.abs() {
            step = half;
            prev_step = half;
        } else {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // secant
                (2.0 * half * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * half * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }

            if 2.0 * p < 3.0 * half * q - (tol * q).abs() && p < (0.5 * prev_step * q).abs() {
                prev_step = step;
                step = p / q;
            } else {
                step = half;
                prev_step = half;
            }
        }

        a = b;
        fa = fb;
        b += if step.abs() > tol { step } else { tol.copysign(half) };
        fb = range_error(b);
        evaluations += 1;

        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            step = b - a;
            prev_step = step;
        }
    }
}
