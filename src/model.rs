//! Common contract shared by the reference integrator and the closed-form models.

use serde::{Deserialize, Serialize};

use crate::constants::{BACKWARD_RANGE_GRACE_TIME, DEFAULT_MAX_TIME, DEFAULT_TIME_STEP};
use crate::linear_drag::LinearDragModel;
use crate::quadratic_drag::QuadraticDragModel;
use crate::separable_drag::SeparableDragModel;
use crate::trajectory::{Trajectory, TrajectoryPoint};

/// Step size and cutoffs applied by every `simulate` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationLimits {
    pub dt: f64,                 // seconds
    pub max_time: f64,           // seconds
    pub max_range: Option<f64>,  // meters
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            dt: DEFAULT_TIME_STEP,
            max_time: DEFAULT_MAX_TIME,
            max_range: None,
        }
    }
}

impl SimulationLimits {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_max_time(mut self, max_time: f64) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = Some(max_range);
        self
    }

    /// A non-positive or non-finite step would never advance time.
    pub(crate) fn can_step(&self) -> bool {
        self.dt.is_finite() && self.dt > 0.0
    }

    /// Whether a freshly recorded sample ends the flight.
    ///
    /// Checked in order: below ground, past `max_range`, then range regression
    /// against the previous sample once the launch grace period has passed.
    pub(crate) fn terminates(&self, point: &TrajectoryPoint, prev_x: f64) -> bool {
        if point.y < 0.0 {
            return true;
        }
        if let Some(max_range) = self.max_range {
            if point.x > max_range {
                return true;
            }
        }
        point.t > BACKWARD_RANGE_GRACE_TIME && point.x < prev_x
    }
}

/// Which of the three models produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Reference,
    LinearApproximation,
    SeparableAnalytic,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ModelKind::Reference => "quadratic (RK4)",
            ModelKind::LinearApproximation => "linear",
            ModelKind::SeparableAnalytic => "analytical",
        };
        write!(f, "{label}")
    }
}

/// Anything that can produce a trajectory from a muzzle velocity and elevation
pub trait TrajectoryModel {
    fn kind(&self) -> ModelKind;

    /// Simulate one shot. Always returns at least the launch sample.
    fn simulate(&self, v0: f64, angle_rad: f64, limits: &SimulationLimits) -> Trajectory;
}

/// Closed set of models, used where a model has to travel as a value
/// (batch tasks, sweep plans).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Model {
    Reference(QuadraticDragModel),
    LinearApproximation(LinearDragModel),
    SeparableAnalytic(SeparableDragModel),
}

impl TrajectoryModel for Model {
    fn kind(&self) -> ModelKind {
        match self {
            Model::Reference(_) => ModelKind::Reference,
            Model::LinearApproximation(_) => ModelKind::LinearApproximation,
            Model::SeparableAnalytic(_) => ModelKind::SeparableAnalytic,
        }
    }

    fn simulate(&self, v0: f64, angle_rad: f64, limits: &SimulationLimits) -> Trajectory {
        match self {
            Model::Reference(model) => model.simulate(v0, angle_rad, limits),
            Model::LinearApproximation(model) => model.simulate(v0, angle_rad, limits),
            Model::SeparableAnalytic(model) => model.simulate(v0, angle_rad, limits),
        }
    }
}

impl From<QuadraticDragModel> for Model {
    fn from(model: QuadraticDragModel) -> Self {
        Model::Reference(model)
    }
}

impl From<LinearDragModel> for Model {
    fn from(model: LinearDragModel) -> Self {
        Model::LinearApproximation(model)
    }
}

impl From<SeparableDragModel> for Model {
    fn from(model: SeparableDragModel) -> Self {
        Model::SeparableAnalytic(model)
    }
}

/// Walk a closed-form position function forward in fixed steps.
///
/// Velocities are finite differences of consecutive positions; the launch
/// sample carries the exact muzzle velocity.
pub(crate) fn sample_closed_form<F>(
    v0: f64,
    angle_rad: f64,
    limits: &SimulationLimits,
    position_at: F,
) -> Trajectory
where
    F: Fn(f64) -> (f64, f64),
{
    let launch = TrajectoryPoint::new(0.0, 0.0, 0.0, v0 * angle_rad.cos(), v0 * angle_rad.sin());
    let mut points = vec![launch];

    if !limits.can_step() {
        return Trajectory::from_points(points);
    }

    let dt = limits.dt;
    let mut step = 1usize;
    let mut prev = launch;

    loop {
        let t = step as f64 * dt;
        if t >= limits.max_time {
            break;
        }

        let (x, y) = position_at(t);
        let point = TrajectoryPoint::new(t, x, y, (x - prev.x) / dt, (y - prev.y) / dt);
        if !point.is_finite() {
            break;
        }

        points.push(point);
        if limits.terminates(&point, prev.x) {
            break;
        }

        prev = point;
        step += 1;
    }

    Trajectory::from_points(points)
}
