//! Reference trajectory: quadratic drag integrated with fixed-step RK4.
//!
//! This is the ground truth every analytic model is calibrated against.
//! The state vector is `[x, y, vx, vy]`; every RK4 stage builds a new value
//! instead of updating a shared buffer.

use nalgebra::{Vector2, Vector4};

use crate::constants::{GRAVITY_MPS2, MIN_VELOCITY_THRESHOLD};
use crate::error::{ensure_positive, Result};
use crate::model::{ModelKind, SimulationLimits, TrajectoryModel};
use crate::trajectory::{Trajectory, TrajectoryPoint};

type State = Vector4<f64>;

/// Quadratic drag: a = -k·|v|·v - g·ŷ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticDragModel {
    k: f64,       // 1/m
    gravity: f64, // m/s²
}

impl QuadraticDragModel {
    pub fn new(k: f64) -> Result<Self> {
        Self::with_gravity(k, GRAVITY_MPS2)
    }

    pub fn with_gravity(k: f64, gravity: f64) -> Result<Self> {
        Ok(Self {
            k: ensure_positive("quadratic drag coefficient k", k)?,
            gravity: ensure_positive("gravity", gravity)?,
        })
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Terminal velocity under quadratic drag, sqrt(g/k)
    pub fn terminal_velocity(&self) -> f64 {
        (self.gravity / self.k).sqrt()
    }

    /// Derivative of the state: (vx, vy, ax, ay)
    pub fn derivatives(&self, state: &State) -> State {
        let vel = Vector2::new(state[2], state[3]);
        let speed = vel.norm();

        // Zero speed has no drag direction
        let drag = if speed < MIN_VELOCITY_THRESHOLD {
            Vector2::zeros()
        } else {
            -self.k * speed * vel
        };

        State::new(vel.x, vel.y, drag.x, drag.y - self.gravity)
    }

    fn rk4_step(&self, state: &State, dt: f64) -> State {
        let k1 = self.derivatives(state);
        let k2 = self.derivatives(&(state + k1 * (0.5 * dt)));
        let k3 = self.derivatives(&(state + k2 * (0.5 * dt)));
        let k4 = self.derivatives(&(state + k3 * dt));

        state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
    }
}

impl TrajectoryModel for QuadraticDragModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Reference
    }

    fn simulate(&self, v0: f64, angle_rad: f64, limits: &SimulationLimits) -> Trajectory {
        let mut state = State::new(0.0, 0.0, v0 * angle_rad.cos(), v0 * angle_rad.sin());
        let mut points = vec![TrajectoryPoint::new(0.0, state[0], state[1], state[2], state[3])];

        if !limits.can_step() {
            return Trajectory::from_points(points);
        }

        let dt = limits.dt;
        let mut step = 0usize;

        loop {
            let t = step as f64 * dt;
            if t >= limits.max_time {
                break;
            }

            let next = self.rk4_step(&state, dt);
            let point = TrajectoryPoint::new(t + dt, next[0], next[1], next[2], next[3]);
            if !point.is_finite() {
                break;
            }

            points.push(point);
            if limits.terminates(&point, state[0]) {
                break;
            }

            state = next;
            step += 1;
        }

        Trajectory::from_points(points)
    }
}
