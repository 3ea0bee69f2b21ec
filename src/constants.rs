/// Physical and numerical constants used by the models and the fitter

/// Gravitational acceleration used by the quadratic-drag reference in m/s²
///
/// The analytic models take their gravity from `ShellParameters::linear_gravity`,
/// which may be tuned away from this value for game balance.
pub const GRAVITY_MPS2: f64 = 9.81;

/// Standard air density at sea level (kg/m³)
pub const STANDARD_AIR_DENSITY: f64 = 1.225;

// Simulation defaults
/// Fixed integration / sampling step in seconds
pub const DEFAULT_TIME_STEP: f64 = 0.05;

/// Hard stop for any simulated flight in seconds
pub const DEFAULT_MAX_TIME: f64 = 200.0;

/// Time after which a shrinking horizontal position ends a trajectory
///
/// Very steep shots stall near the apex and can drift back toward the gun;
/// the first second of flight is exempt so the launch transient never trips it.
pub const BACKWARD_RANGE_GRACE_TIME: f64 = 1.0;

// Numerical stability constants
/// Minimum threshold for velocity magnitude to avoid division by zero
pub const MIN_VELOCITY_THRESHOLD: f64 = 1e-12;

/// Minimum threshold for preventing division by zero in general calculations
pub const MIN_DIVISION_THRESHOLD: f64 = 1e-12;

/// Tolerance for root finding algorithms
pub const ROOT_FINDING_TOLERANCE: f64 = 1e-6;

// Quadratic drag search
/// Lower bound of the quadratic drag coefficient search (1/m)
pub const K_SEARCH_MIN: f64 = 0.00001;

/// Upper bound of the quadratic drag coefficient search (1/m)
pub const K_SEARCH_MAX: f64 = 0.0005;

/// Upper bound used when fitting k to a maximum height only
///
/// Height-only shots are usually steep and short, so the search is allowed
/// twice the drag of the standard fit.
pub const K_HEIGHT_SEARCH_MAX: f64 = 0.001;

/// Absolute x tolerance of the bounded minimizer for k fits
pub const K_SEARCH_XATOL: f64 = 1e-10;

/// Absolute x tolerance for the height-only k fit
pub const K_HEIGHT_SEARCH_XATOL: f64 = 1e-12;

/// Function evaluation budget for the bounded minimizer
pub const MINIMIZER_MAX_EVALUATIONS: usize = 500;

/// Grid size of the k scan used for error-surface diagnostics
pub const K_SCAN_SAMPLES: usize = 200;

/// Weight applied to time and velocity when a fit prioritizes max height
pub const HEIGHT_PRIORITY_SECONDARY_WEIGHT: f64 = 0.1;

// Linear drag sweep
/// Smallest linear drag coefficient in the β sweep (1/s)
pub const BETA_SWEEP_MIN: f64 = 0.005;

/// Largest linear drag coefficient in the β sweep (1/s)
pub const BETA_SWEEP_MAX: f64 = 0.03;

/// Number of β candidates in the sweep
pub const BETA_SWEEP_SAMPLES: usize = 300;

/// Number of range grid points used for the RMS velocity comparison
pub const RMS_VELOCITY_GRID_POINTS: usize = 100;

/// Allowed deviation of the β-sweep weights from a unit sum before normalizing
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

// Time warp defaults
/// Minimum time-warp rate; 1.0 and above disables the warp
pub const DEFAULT_TIME_WARP_MIN_RATE: f64 = 1.0;

/// Time at which the warp rate bottoms out (seconds)
pub const DEFAULT_TIME_WARP_APEX: f64 = 30.0;

// Batch evaluator
/// How long an idle worker blocks on the queue before rechecking shutdown
pub const WORKER_POLL_INTERVAL_MS: u64 = 50;

/// Smallest worker pool the evaluator will build by default
pub const MIN_DEFAULT_WORKERS: usize = 2;

/// Largest worker pool the evaluator will build by default
pub const MAX_DEFAULT_WORKERS: usize = 16;

/// Number of sub-chunks the reference model's angle sweep is split into
pub const DEFAULT_REFERENCE_CHUNKS: usize = 4;

// Aiming
/// Lowest elevation considered when solving for a range (radians)
pub const MIN_AIM_ELEVATION: f64 = 1e-4;

/// Evaluation budget for the elevation root search
pub const AIM_MAX_ITERATIONS: usize = 100;

/// Elevation tolerance of the maximum-range search (radians)
pub const AIM_ELEVATION_XATOL: f64 = 1e-6;
