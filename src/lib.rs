//! # Drag Calibration
//!
//! Calibrates cheap closed-form projectile models against a quadratic-drag
//! RK4 reference so real-time consumers can use the closed form while staying
//! close to the physically accurate trajectory.

// Re-export the main types and functions
pub use aim::{elevation_for_range, max_range_elevation, AimSolution};
pub use batch::{BatchConfig, BatchEvaluator, BatchResult, BatchTask, TaskFailure, TaskOutput};
pub use error::{CalibrationError, Result};
pub use fitting::{
    fit_k_from_height, fit_linear_beta, fit_quadratic_k, fit_quadratic_k_with_mode,
    quadratic_fit_error, scan_quadratic_k, BetaCandidate, BetaSweep, ErrorWeights, FitMode,
    FitResult, KBounds, LinearFitConfig, LinearFitResult, LinearFitWeights,
};
pub use linear_drag::{LinearDragModel, TimeWarp};
pub use model::{Model, ModelKind, SimulationLimits, TrajectoryModel};
pub use optimize::{linspace, minimize_bounded, MinimizeResult};
pub use quadratic_drag::QuadraticDragModel;
pub use separable_drag::SeparableDragModel;
pub use shell::{BallisticDataPoint, ShellParameters, SHELL_PRESETS};
pub use sweep::{
    plan_sweep, summarize_angles, sweep_models, AngleSchedule, AngleSummary, ModelSweep, SweepPlan,
};
pub use synthetic::{synthesize_data_points, synthesize_noisy_data_points, ObservationNoise};
pub use trajectory::{Trajectory, TrajectoryPoint, TrajectorySummary};

// Module declarations
pub mod aim;
pub mod batch;
pub mod constants;
mod error;
pub mod fitting;
pub mod linear_drag;
mod model;
pub mod optimize;
pub mod quadratic_drag;
pub mod separable_drag;
mod shell;
pub mod sweep;
pub mod synthetic;
mod trajectory;
