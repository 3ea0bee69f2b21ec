//! Drag coefficient fitting.
//!
//! Two different objective shapes live here. The quadratic `k` of the reference
//! model is found with a bounded Brent search against ballistic observations,
//! while the linear `β` of the closed-form model is picked from a dense sweep
//! against a reference trajectory.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    BETA_SWEEP_MAX, BETA_SWEEP_MIN, BETA_SWEEP_SAMPLES, GRAVITY_MPS2,
    HEIGHT_PRIORITY_SECONDARY_WEIGHT, K_HEIGHT_SEARCH_MAX, K_HEIGHT_SEARCH_XATOL, K_SEARCH_MAX,
    K_SEARCH_MIN, K_SEARCH_XATOL, MINIMIZER_MAX_EVALUATIONS, RMS_VELOCITY_GRID_POINTS,
    WEIGHT_SUM_TOLERANCE,
};
use crate::error::{ensure_positive, CalibrationError, Result};
use crate::linear_drag::{LinearDragModel, TimeWarp};
use crate::model::{SimulationLimits, TrajectoryModel};
use crate::optimize::{linspace, minimize_bounded};
use crate::quadratic_drag::QuadraticDragModel;
use crate::shell::{BallisticDataPoint, ShellParameters};
use crate::trajectory::{Trajectory, TrajectorySummary};

/// Weights of the per-observable squared errors in the `k` fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorWeights {
    pub range: f64,
    pub time: f64,
    pub velocity: f64,
    pub height: f64,
}

impl Default for ErrorWeights {
    fn default() -> Self {
        Self {
            range: 1.0,
            time: 1.0,
            velocity: 1.0,
            height: 1.0,
        }
    }
}

/// Search interval for a drag coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for KBounds {
    fn default() -> Self {
        Self {
            min: K_SEARCH_MIN,
            max: K_SEARCH_MAX,
        }
    }
}

impl KBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Wider interval used by the height-only fit
    pub fn for_height() -> Self {
        Self {
            min: K_SEARCH_MIN,
            max: K_HEIGHT_SEARCH_MAX,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min < self.max {
            Ok(())
        } else {
            Err(CalibrationError::InvalidBounds {
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// How a data point's errors are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// Range, time, velocity and (when given) height, weighted equally by `ErrorWeights`
    #[default]
    Standard,
    /// Points with a max height are matched on height first; time and velocity
    /// only nudge the result
    HeightPriority,
}

/// Outcome of a drag coefficient search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub coefficient: f64,
    pub error: f64,
    pub converged: bool,
    pub evaluations: usize,
    /// `(coefficient, error)` for every grid point of a scan
    pub curve: Option<Vec<(f64, f64)>>,
}

/// Relative errors of one trajectory against one observation
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointErrors {
    range: f64,
    time: f64,
    velocity: f64,
    height: f64,
}

impl PointErrors {
    fn new(dp: &BallisticDataPoint, summary: &TrajectorySummary) -> Self {
        Self {
            range: relative_error(summary.range, dp.range),
            time: relative_error(summary.time_of_flight, dp.time),
            velocity: relative_error(summary.impact_velocity, dp.impact_velocity),
            height: relative_error(summary.max_height, dp.max_height),
        }
    }

    fn combine(&self, dp: &BallisticDataPoint, weights: &ErrorWeights, mode: FitMode) -> f64 {
        let secondary = weights.time * self.time.powi(2) + weights.velocity * self.velocity.powi(2);

        match mode {
            FitMode::HeightPriority if dp.uses_height() => {
                weights.height * self.height.powi(2) + HEIGHT_PRIORITY_SECONDARY_WEIGHT * secondary
            }
            _ => {
                let mut error = weights.range * self.range.powi(2) + secondary;
                if dp.uses_height() {
                    error += weights.height * self.height.powi(2);
                }
                error
            }
        }
    }
}

/// |actual − target| / target, or 0 when the target is unused
fn relative_error(actual: f64, target: f64) -> f64 {
    if target > 0.0 {
        (actual - target).abs() / target
    } else {
        0.0
    }
}

/// Limits the reference runs with while fitting a shell
fn shell_limits(shell: &ShellParameters) -> SimulationLimits {
    let limits = SimulationLimits::default();
    if shell.max_range > 0.0 {
        limits.with_max_range(shell.max_range)
    } else {
        limits
    }
}

/// Weighted mean over the shell's data points of each point's combined error.
///
/// Never fails: `k <= 0`, a non-positive muzzle velocity, a degenerate
/// trajectory or an empty data set all evaluate to `f64::INFINITY`.
pub fn quadratic_fit_error(
    shell: &ShellParameters,
    k: f64,
    weights: &ErrorWeights,
    mode: FitMode,
) -> f64 {
    if ensure_positive("muzzle velocity", shell.muzzle_velocity).is_err() {
        return f64::INFINITY;
    }
    let model = match QuadraticDragModel::new(k) {
        Ok(model) => model,
        Err(_) => return f64::INFINITY,
    };
    let limits = shell_limits(shell);

    let mut total_error = 0.0;
    let mut total_weight = 0.0;

    for dp in &shell.data_points {
        let traj = model.simulate(shell.muzzle_velocity, dp.elevation, &limits);
        let summary = match traj.summary() {
            Some(summary) => summary,
            None => return f64::INFINITY,
        };

        total_error += dp.weight * PointErrors::new(dp, &summary).combine(dp, weights, mode);
        total_weight += dp.weight;
    }

    if total_weight > 0.0 {
        total_error / total_weight
    } else {
        f64::INFINITY
    }
}

/// Fit the reference model's `k` to the shell's data points.
pub fn fit_quadratic_k(
    shell: &ShellParameters,
    bounds: KBounds,
    weights: &ErrorWeights,
) -> Result<FitResult> {
    fit_quadratic_k_with_mode(shell, bounds, weights, FitMode::Standard)
}

pub fn fit_quadratic_k_with_mode(
    shell: &ShellParameters,
    bounds: KBounds,
    weights: &ErrorWeights,
    mode: FitMode,
) -> Result<FitResult> {
    if shell.data_points.is_empty() {
        return Err(CalibrationError::NoDataPoints);
    }
    ensure_positive("muzzle velocity", shell.muzzle_velocity)?;
    bounds.validate()?;

    let result = minimize_bounded(
        |k| quadratic_fit_error(shell, k, weights, mode),
        bounds.min,
        bounds.max,
        K_SEARCH_XATOL,
        MINIMIZER_MAX_EVALUATIONS,
    )?;

    if !result.value.is_finite() {
        return Err(CalibrationError::NoViableCandidate);
    }
    if !result.converged {
        warn!(
            "k search for {} did not converge after {} evaluations, using k={:.6e}",
            shell.name, result.evaluations, result.x
        );
    }

    info!(
        "{}: k={:.6e} (error {:.6e}, {} evaluations)",
        shell.name, result.x, result.value, result.evaluations
    );
    log_point_breakdown(shell, result.x);

    Ok(FitResult {
        coefficient: result.x,
        error: result.value,
        converged: result.converged,
        evaluations: result.evaluations,
        curve: None,
    })
}

fn log_point_breakdown(shell: &ShellParameters, k: f64) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let Ok(model) = QuadraticDragModel::new(k) else {
        return;
    };
    let limits = shell_limits(shell);

    for dp in &shell.data_points {
        let traj = model.simulate(shell.muzzle_velocity, dp.elevation, &limits);
        let Some(summary) = traj.summary() else {
            continue;
        };
        debug!(
            "  {:.2}°: range {:.0}/{:.0} m, time {:.2}/{:.2} s, \
             velocity {:.1}/{:.1} m/s, height {:.0}/{:.0} m",
            dp.elevation.to_degrees(),
            summary.range,
            dp.range,
            summary.time_of_flight,
            dp.time,
            summary.impact_velocity,
            dp.impact_velocity,
            summary.max_height,
            dp.max_height
        );
    }
}

/// Evaluate the `k` error on an evenly spaced grid and keep the best point.
///
/// Slower than the bounded search but returns the whole error curve.
pub fn scan_quadratic_k(
    shell: &ShellParameters,
    bounds: KBounds,
    samples: usize,
    weights: &ErrorWeights,
) -> Result<FitResult> {
    if shell.data_points.is_empty() {
        return Err(CalibrationError::NoDataPoints);
    }
    ensure_positive("muzzle velocity", shell.muzzle_velocity)?;
    bounds.validate()?;

    let curve: Vec<(f64, f64)> = linspace(bounds.min, bounds.max, samples)
        .into_iter()
        .map(|k| (k, quadratic_fit_error(shell, k, weights, FitMode::Standard)))
        .collect();

    let (coefficient, error) = curve
        .iter()
        .copied()
        .filter(|(_, error)| error.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(CalibrationError::NoViableCandidate)?;

    debug!("k scan over {} samples: best k={:.6e}", curve.len(), coefficient);

    Ok(FitResult {
        coefficient,
        error,
        converged: true,
        evaluations: curve.len(),
        curve: Some(curve),
    })
}

/// Fit `k` so the reference reaches `target_height` at the given elevation.
pub fn fit_k_from_height(
    muzzle_velocity: f64,
    elevation_rad: f64,
    target_height: f64,
    bounds: KBounds,
) -> Result<FitResult> {
    let muzzle_velocity = ensure_positive("muzzle velocity", muzzle_velocity)?;
    let target_height = ensure_positive("target height", target_height)?;
    bounds.validate()?;

    let limits = SimulationLimits::default();
    let height_error = |k: f64| -> f64 {
        let Ok(model) = QuadraticDragModel::new(k) else {
            return f64::INFINITY;
        };
        let traj = model.simulate(muzzle_velocity, elevation_rad, &limits);
        if traj.is_degenerate() {
            return f64::INFINITY;
        }
        (traj.max_height() - target_height).abs() / target_height
    };

    let result = minimize_bounded(
        height_error,
        bounds.min,
        bounds.max,
        K_HEIGHT_SEARCH_XATOL,
        MINIMIZER_MAX_EVALUATIONS,
    )?;

    if !result.value.is_finite() {
        return Err(CalibrationError::NoViableCandidate);
    }
    if !result.converged {
        warn!(
            "height fit did not converge after {} evaluations, using k={:.6e}",
            result.evaluations, result.x
        );
    }
    info!(
        "k={:.6e} for {:.0} m apex at {:.2}° (error {:.3e})",
        result.x,
        target_height,
        elevation_rad.to_degrees(),
        result.value
    );

    Ok(FitResult {
        coefficient: result.x,
        error: result.value,
        converged: result.converged,
        evaluations: result.evaluations,
        curve: None,
    })
}

/// Weights of the four β-sweep error terms; they should sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFitWeights {
    pub range: f64,
    pub impact_velocity: f64,
    pub time: f64,
    pub rms_velocity: f64,
}

impl Default for LinearFitWeights {
    fn default() -> Self {
        Self {
            range: 0.1,
            impact_velocity: 0.1,
            time: 0.1,
            rms_velocity: 0.7,
        }
    }
}

impl LinearFitWeights {
    pub fn sum(&self) -> f64 {
        self.range + self.impact_velocity + self.time + self.rms_velocity
    }

    /// Rescale to a unit sum, warning when that changes anything.
    pub fn normalized(&self) -> Result<Self> {
        let total = ensure_positive("linear fit weight sum", self.sum())?;
        if (total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE {
            return Ok(*self);
        }

        warn!("linear fit weights sum to {total:.3}, normalizing to 1.0");
        Ok(Self {
            range: self.range / total,
            impact_velocity: self.impact_velocity / total,
            time: self.time / total,
            rms_velocity: self.rms_velocity / total,
        })
    }
}

/// Candidate β values tried by the sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaSweep {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl Default for BetaSweep {
    fn default() -> Self {
        Self {
            min: BETA_SWEEP_MIN,
            max: BETA_SWEEP_MAX,
            samples: BETA_SWEEP_SAMPLES,
        }
    }
}

impl BetaSweep {
    pub fn values(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.samples)
    }
}

/// Everything the β sweep needs besides the shell and reference `k`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFitConfig {
    pub gravity: f64,
    pub time_warp: TimeWarp,
    pub weights: LinearFitWeights,
    pub sweep: BetaSweep,
}

impl Default for LinearFitConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY_MPS2,
            time_warp: TimeWarp::identity(),
            weights: LinearFitWeights::default(),
            sweep: BetaSweep::default(),
        }
    }
}

impl LinearFitConfig {
    /// Gravity and time warp taken from the shell, default weights and sweep.
    pub fn from_shell(shell: &ShellParameters) -> Self {
        Self {
            gravity: shell.linear_gravity,
            time_warp: shell.time_warp(),
            ..Self::default()
        }
    }
}

/// One β of the sweep with its errors against the reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaCandidate {
    pub beta: f64,
    pub range: f64,
    pub time: f64,
    pub impact_velocity: f64,
    pub range_error: f64,
    pub time_error: f64,
    pub impact_velocity_error: f64,
    pub rms_velocity_error: f64,
    pub total_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFitResult {
    pub optimal_beta: f64,
    /// Every usable candidate, best first
    pub all_results: Vec<BetaCandidate>,
    pub reference: Trajectory,
}

impl LinearFitResult {
    pub fn best(&self) -> Option<&BetaCandidate> {
        self.all_results.first()
    }
}

/// Pick the linear drag β that best tracks the reference model with drag `k_reference`.
///
/// The reference is flown at the shell's first data point elevation with no
/// range cutoff.
pub fn fit_linear_beta(
    shell: &ShellParameters,
    k_reference: f64,
    config: &LinearFitConfig,
) -> Result<LinearFitResult> {
    let elevation = shell
        .primary_data_point()
        .map(|dp| dp.elevation)
        .ok_or(CalibrationError::NoDataPoints)?;
    let weights = config.weights.normalized()?;
    let v0 = ensure_positive("muzzle velocity", shell.muzzle_velocity)?;
    let gravity = ensure_positive("gravity", config.gravity)?;
    let time_warp = config.time_warp.validate()?;
    let limits = SimulationLimits::default();

    let reference = QuadraticDragModel::new(k_reference)?.simulate(v0, elevation, &limits);
    let ref_summary = reference.summary().ok_or(CalibrationError::DegenerateTrajectory {
        samples: reference.len(),
    })?;
    let betas = config.sweep.values();
    debug!(
        "sweeping {} β values from {:.6} to {:.6} for {}",
        betas.len(),
        config.sweep.min,
        config.sweep.max,
        shell.name
    );

    let mut all_results = Vec::with_capacity(betas.len());
    for beta in betas.into_iter().filter(|&beta| beta > 0.0) {
        let model = LinearDragModel::with_params(beta, gravity, time_warp)?;
        let traj = model.simulate(v0, elevation, &limits);
        let Some(summary) = traj.summary() else {
            continue;
        };
        all_results.push(score_candidate(
            beta,
            &traj,
            &summary,
            &reference,
            &ref_summary,
            v0,
            &weights,
        ));
    }

    all_results.sort_by(|a, b| a.total_error.total_cmp(&b.total_error));

    let best = all_results.first().ok_or(CalibrationError::NoViableCandidate)?;
    info!(
        "{}: β={:.6} (range {:.0} m {:+.2}%, time {:.2} s {:+.2}%, rms velocity {:.2}%)",
        shell.name,
        best.beta,
        best.range,
        best.range_error * 100.0,
        best.time,
        best.time_error * 100.0,
        best.rms_velocity_error * 100.0
    );

    Ok(LinearFitResult {
        optimal_beta: best.beta,
        all_results,
        reference,
    })
}

fn score_candidate(
    beta: f64,
    traj: &Trajectory,
    summary: &TrajectorySummary,
    reference: &Trajectory,
    ref_summary: &TrajectorySummary,
    muzzle_velocity: f64,
    weights: &LinearFitWeights,
) -> BetaCandidate {
    let range_error = relative_error(summary.range, ref_summary.range);
    let time_error = relative_error(summary.time_of_flight, ref_summary.time_of_flight);
    let impact_velocity_error =
        relative_error(summary.impact_velocity, ref_summary.impact_velocity);

    // Compare speed profiles over the range both trajectories cover
    let grid = linspace(0.0, summary.range.min(ref_summary.range), RMS_VELOCITY_GRID_POINTS);
    let candidate_speeds = traj.speeds_on_grid(&grid);
    let reference_speeds = reference.speeds_on_grid(&grid);
    let mean_square = candidate_speeds
        .iter()
        .zip(&reference_speeds)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / grid.len() as f64;
    let rms_velocity_error = mean_square.sqrt() / muzzle_velocity;

    let total_error = weights.range * range_error
        + weights.impact_velocity * impact_velocity_error
        + weights.time * time_error
        + weights.rms_velocity * rms_velocity_error;

    BetaCandidate {
        beta,
        range: summary.range,
        time: summary.time_of_flight,
        impact_velocity: summary.impact_velocity,
        range_error,
        time_error,
        impact_velocity_error,
        rms_velocity_error,
        total_error,
    }
}
