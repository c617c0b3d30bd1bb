//! Error types for pendular.
//!
//! Every fallible operation returns `Result<T, SimError>` instead of panicking.
//! Errors are grouped the same way the pipeline fails:
//! invalid inputs are rejected before any integration step, integration
//! failures abort the run without a partial trajectory, and analysis shape
//! errors abort without a partial report.

use thiserror::Error;

/// Result type alias for pendular operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all pendular operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Input Errors =====
    /// A physical parameter, time span, sample count or initial state is unusable.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    // ===== Integration Errors =====
    /// The adaptive solver could not meet its tolerance.
    #[error("Integration failed at t={time:.6} (h={step:.3e}): {message}")]
    Integration {
        /// Solver time at which the failure was detected.
        time: f64,
        /// Step size that was being attempted.
        step: f64,
        /// Description of the failure.
        message: String,
    },

    /// The 2x2 acceleration solve became numerically singular.
    #[error("Singular mass matrix at t={time:.6}: denominator {denominator:.3e}")]
    SingularMassMatrix {
        /// Time of the derivative evaluation.
        time: f64,
        /// Value of `a*d - c*b`.
        denominator: f64,
    },

    // ===== Jidoka Violations =====
    /// Numerical instability detected (NaN or Inf).
    #[error("Jidoka: non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    /// Constraint violation detected.
    #[error("Jidoka: constraint '{name}' violated by {violation:.6e} (tolerance: {tolerance:.6e})")]
    ConstraintViolation {
        /// Name of the violated constraint.
        name: String,
        /// Amount of violation.
        violation: f64,
        /// Configured tolerance.
        tolerance: f64,
    },

    // ===== Analysis Errors =====
    /// Empty or length-mismatched series handed to an analyzer.
    #[error("Shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A scenario worker thread panicked.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Malformed tabular input.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number in the input.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}

impl SimError {
    /// Create an invalid-parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an integration (non-convergence) error.
    #[must_use]
    pub fn integration(time: f64, step: f64, message: impl Into<String>) -> Self {
        Self::Integration {
            time,
            step,
            message: message.into(),
        }
    }

    /// Create a shape-mismatch error.
    #[must_use]
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a parse error for the given 1-based line.
    #[must_use]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an I/O error with a message (wraps in `std::io::Error`).
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(std::io::Error::other(message.into()))
    }

    /// Check if this error is a Jidoka violation (requires immediate stop).
    #[must_use]
    pub const fn is_jidoka_violation(&self) -> bool {
        matches!(
            self,
            Self::NonFiniteValue { .. }
                | Self::ConstraintViolation { .. }
                | Self::SingularMassMatrix { .. }
        )
    }

    /// Check if this error was raised before any integration work began.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::Config { .. } | Self::Validation(_)
        )
    }
}
