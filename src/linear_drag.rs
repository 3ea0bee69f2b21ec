//! Closed-form linear drag with an optional non-uniform time warp.
//!
//! Linear drag has an exact solution, so a game can evaluate position at any
//! time without integrating. On its own it decays velocity too evenly to track
//! a quadratic-drag shell; the time warp reshapes the flow of time so the curve
//! can be bent toward the reference without touching the formula.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TIME_WARP_APEX, DEFAULT_TIME_WARP_MIN_RATE, GRAVITY_MPS2};
use crate::error::{ensure_positive, Result};
use crate::model::{sample_closed_form, ModelKind, SimulationLimits, TrajectoryModel};
use crate::trajectory::Trajectory;

/// Quadratic time-rate profile: rate(t) = min_rate + k_w·(t − apex)²
///
/// `k_w` is chosen so that rate(0) = 1. The rate dips to `min_rate` at `apex`
/// and climbs back past 1 afterwards. `min_rate >= 1` disables the warp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWarp {
    pub min_rate: f64,
    pub apex: f64, // seconds
}

impl Default for TimeWarp {
    fn default() -> Self {
        Self {
            min_rate: DEFAULT_TIME_WARP_MIN_RATE,
            apex: DEFAULT_TIME_WARP_APEX,
        }
    }
}

impl TimeWarp {
    pub fn new(min_rate: f64, apex: f64) -> Self {
        Self { min_rate, apex }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.min_rate >= 1.0
    }

    /// A warp that is not the identity must keep time moving forward.
    pub(crate) fn validate(self) -> Result<Self> {
        if !self.is_identity() {
            ensure_positive("time warp min rate", self.min_rate)?;
        }
        Ok(self)
    }

    fn curvature(&self) -> f64 {
        if self.apex > 0.0 {
            (1.0 - self.min_rate) / (self.apex * self.apex)
        } else {
            0.0
        }
    }

    /// Instantaneous rate of warped time
    pub fn rate(&self, t: f64) -> f64 {
        if self.is_identity() {
            return 1.0;
        }
        let dt = t - self.apex;
        self.min_rate + self.curvature() * dt * dt
    }

    /// Warped time: the integral of `rate` from 0 to `t`.
    pub fn warp(&self, t: f64) -> f64 {
        if self.is_identity() {
            return t;
        }
        let apex = self.apex;
        self.min_rate * t + self.curvature() * ((t - apex).powi(3) + apex.powi(3)) / 3.0
    }
}

/// Linear drag (a = -β·v - g·ŷ) evaluated in closed form on warped time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDragModel {
    beta: f64,    // 1/s
    gravity: f64, // m/s²
    time_warp: TimeWarp,
}

impl LinearDragModel {
    pub fn new(beta: f64) -> Result<Self> {
        Self::with_params(beta, GRAVITY_MPS2, TimeWarp::identity())
    }

    pub fn with_params(beta: f64, gravity: f64, time_warp: TimeWarp) -> Result<Self> {
        let beta = ensure_positive("linear drag coefficient beta", beta)?;
        let gravity = ensure_positive("gravity", gravity)?;
        let time_warp = time_warp.validate()?;
        Ok(Self { beta, gravity, time_warp })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn time_warp(&self) -> TimeWarp {
        self.time_warp
    }

    /// Terminal descent speed g/β
    pub fn terminal_velocity(&self) -> f64 {
        self.gravity / self.beta
    }

    /// Position at real time `t` for launch velocity components (v0x, v0y).
    pub fn position_at(&self, v0x: f64, v0y: f64, t: f64) -> (f64, f64) {
        let tw = self.time_warp.warp(t);
        let beta = self.beta;
        let g = self.gravity;

        let drag_factor = 1.0 - (-beta * tw).exp();

        let x = (v0x / beta) * drag_factor;
        let y = (v0y / beta) * drag_factor - (g / beta) * tw + (g / (beta * beta)) * drag_factor;

        (x, y)
    }
}

impl TrajectoryModel for LinearDragModel {
    fn kind(&self) -> ModelKind {
        ModelKind::LinearApproximation
    }

    fn simulate(&self, v0: f64, angle_rad: f64, limits: &SimulationLimits) -> Trajectory {
        let v0x = v0 * angle_rad.cos();
        let v0y = v0 * angle_rad.sin();
        sample_closed_form(v0, angle_rad, limits, |t| self.position_at(v0x, v0y, t))
    }
}
