//! Separable closed-form drag model.
//!
//! Treats horizontal and vertical motion independently, each with its own
//! exact solution. Quadratic drag really couples the two axes; the horizontal
//! drag is scaled by 1/sqrt(cos θ) to approximate that coupling.
//!
//! With vt = sqrt(g/β) and τ = vt/g the vertical motion splits at the apex:
//! a tangent solution on the way up and a hyperbolic one on the way down.

use crate::constants::{GRAVITY_MPS2, MIN_DIVISION_THRESHOLD};
use crate::error::{ensure_positive, Result};
use crate::model::{sample_closed_form, ModelKind, SimulationLimits, TrajectoryModel};
use crate::trajectory::Trajectory;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparableDragModel {
    beta: f64,
    gravity: f64,
    terminal_velocity: f64, // vt = sqrt(g/β)
    tau: f64,               // vt/g
}

impl SeparableDragModel {
    pub fn new(beta: f64) -> Result<Self> {
        Self::with_gravity(beta, GRAVITY_MPS2)
    }

    pub fn with_gravity(beta: f64, gravity: f64) -> Result<Self> {
        let beta = ensure_positive("analytical drag coefficient beta", beta)?;
        let gravity = ensure_positive("gravity", gravity)?;
        let terminal_velocity = (gravity / beta).sqrt();
        Ok(Self {
            beta,
            gravity,
            terminal_velocity,
            tau: terminal_velocity / gravity,
        })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn terminal_velocity(&self) -> f64 {
        self.terminal_velocity
    }

    /// Time of the apex for an upward launch, zero otherwise
    pub fn apex_time(&self, vy0: f64) -> f64 {
        if vy0 <= 0.0 {
            return 0.0;
        }
        self.tau * (vy0 / self.terminal_velocity).atan()
    }

    /// Horizontal drag with the sqrt(cos θ) coupling correction applied
    fn effective_beta(&self, cos_theta: f64) -> Option<f64> {
        if cos_theta <= MIN_DIVISION_THRESHOLD {
            None
        } else {
            Some(self.beta / cos_theta.sqrt())
        }
    }

    pub fn position_at(&self, v0: f64, angle_rad: f64, t: f64) -> (f64, f64) {
        let x = self.horizontal_position(v0, angle_rad.cos(), t);
        let y = self.vertical_position(v0 * angle_rad.sin(), t);
        (x, y)
    }

    /// Exact time derivative of `position_at`.
    pub fn velocity_at(&self, v0: f64, angle_rad: f64, t: f64) -> (f64, f64) {
        let cos_theta = angle_rad.cos();
        let vx = match self.effective_beta(cos_theta) {
            Some(beta_eff) => {
                let vx0 = v0 * cos_theta;
                vx0 / (1.0 + beta_eff * vx0 * t)
            }
            None => 0.0,
        };
        (vx, self.vertical_velocity(v0 * angle_rad.sin(), t))
    }

    fn horizontal_position(&self, v0: f64, cos_theta: f64, t: f64) -> f64 {
        match self.effective_beta(cos_theta) {
            Some(beta_eff) => (beta_eff * v0 * cos_theta * t).ln_1p() / beta_eff,
            None => 0.0,
        }
    }

    fn vertical_position(&self, vy0: f64, t: f64) -> f64 {
        let vt = self.terminal_velocity;
        let tau = self.tau;
        let scale = tau * vt; // = 1/β

        if vy0 >= 0.0 {
            let phi0 = (vy0 / vt).atan();
            let t_apex = tau * phi0;

            if t <= t_apex {
                let phi = phi0 - t / tau;
                scale * (phi.cos() / phi0.cos()).ln()
            } else {
                let y_apex = scale * (1.0 / phi0.cos()).ln();
                y_apex - scale * ((t - t_apex) / tau).cosh().ln()
            }
        } else {
            let ratio = vy0 / vt;
            if ratio > -1.0 {
                let psi0 = ratio.atanh();
                let psi = psi0 - t / tau;
                scale * (psi0.cosh() / psi.cosh()).ln()
            } else {
                // Faster than terminal velocity: atanh is undefined, fall back
                // to the mean of launch and terminal speed
                let v_avg = (vy0 - vt) * 0.5;
                v_avg * t
            }
        }
    }

    fn vertical_velocity(&self, vy0: f64, t: f64) -> f64 {
        let vt = self.terminal_velocity;
        let tau = self.tau;

        if vy0 >= 0.0 {
            let phi0 = (vy0 / vt).atan();
            let t_apex = tau * phi0;
            if t <= t_apex {
                vt * (phi0 - t / tau).tan()
            } else {
                -vt * ((t - t_apex) / tau).tanh()
            }
        } else {
            let ratio = vy0 / vt;
            if ratio > -1.0 {
                vt * (ratio.atanh() - t / tau).tanh()
            } else {
                (vy0 - vt) * 0.5
            }
        }
    }
}

impl TrajectoryModel for SeparableDragModel {
    fn kind(&self) -> ModelKind {
        ModelKind::SeparableAnalytic
    }

    fn simulate(&self, v0: f64, angle_rad: f64, limits: &SimulationLimits) -> Trajectory {
        sample_closed_form(v0, angle_rad, limits, |t| self.position_at(v0, angle_rad, t))
    }
}
