use thiserror::Error;

/// Errors raised outside of search paths.
///
/// Objective functions evaluated by the minimizers never produce these; they
/// report `f64::INFINITY` instead so the search routes around bad candidates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid search bounds [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },

    #[error("no ballistic data points provided")]
    NoDataPoints,

    #[error("trajectory has {samples} sample(s), at least 2 are required")]
    DegenerateTrajectory { samples: usize },

    #[error("no candidate produced a usable trajectory")]
    NoViableCandidate,

    #[error("root not bracketed: f({lower}) and f({upper}) share a sign")]
    RootNotBracketed { lower: f64, upper: f64 },

    #[error("batch evaluator has been shut down")]
    PoolShutDown,

    #[error("failed to start batch worker: {0}")]
    WorkerSpawn(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Reject non-finite or non-positive values for a named parameter.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalibrationError::InvalidParameter { name, value })
    }
}
