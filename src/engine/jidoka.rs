//! Jidoka (自働化) - Autonomous anomaly detection.
//!
//! Machines that detect problems and stop automatically to prevent defect
//! propagation. For the double pendulum the line stops on:
//!
//! 1. **Non-finite values**: NaN or Inf in an accepted solver state
//! 2. **Constraint violations**: a bob leaving the circle its rigid link allows
//!
//! # Severity Levels
//!
//! - **Acceptable**: Within tolerance, continue normally
//! - **Warning**: Approaching tolerance, log and continue
//! - **Critical**: Tolerance exceeded, stop the line
//! - **Fatal**: Unrecoverable state (NaN/Inf residual), halt immediately

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Severity levels for Jidoka violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Acceptable variance within tolerance (continue).
    Acceptable,
    /// Warning: approaching tolerance boundary (log, continue).
    Warning,
    /// Critical: tolerance exceeded (stop the line).
    Critical,
    /// Fatal: unrecoverable state (halt immediately).
    Fatal,
}

/// Warning from a Jidoka check (non-critical issue).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JidokaWarning {
    /// Constraint approaching violation.
    ConstraintApproaching {
        /// Constraint name.
        name: String,
        /// Current violation amount.
        violation: f64,
        /// Tolerance threshold.
        tolerance: f64,
    },
}

/// Classifier for graduated Jidoka responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityClassifier {
    /// Warning threshold as fraction of tolerance (e.g., 0.8 = warn at 80%).
    pub warning_fraction: f64,
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self {
            warning_fraction: 0.8,
        }
    }
}

impl SeverityClassifier {
    /// Create a new severity classifier.
    #[must_use]
    pub const fn new(warning_fraction: f64) -> Self {
        Self { warning_fraction }
    }

    /// Classify constraint violation severity.
    #[must_use]
    pub fn classify_constraint(&self, violation: f64, tolerance: f64) -> ViolationSeverity {
        let abs_violation = violation.abs();
        if abs_violation.is_nan() || abs_violation.is_infinite() {
            ViolationSeverity::Fatal
        } else if abs_violation > tolerance {
            ViolationSeverity::Critical
        } else if abs_violation > tolerance * self.warning_fraction {
            ViolationSeverity::Warning
        } else {
            ViolationSeverity::Acceptable
        }
    }
}

/// Jidoka guard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JidokaConfig {
    /// NaN/Inf detection on every accepted solver state.
    pub check_finite: bool,
    /// Kinematic constraint tolerance (absolute residual of the squared link
    /// length beyond floating-point rounding).
    pub constraint_tolerance: f64,
    /// Severity classifier for graduated responses.
    pub severity_classifier: SeverityClassifier,
}

impl Default for JidokaConfig {
    fn default() -> Self {
        Self {
            check_finite: true,
            constraint_tolerance: 1e-9,
            severity_classifier: SeverityClassifier::default(),
        }
    }
}

/// Jidoka guard for autonomous anomaly detection.
///
/// # Example
///
/// ```rust
/// use pendular::engine::jidoka::{JidokaConfig, JidokaGuard};
///
/// let guard = JidokaGuard::new(JidokaConfig::default());
/// assert!(guard.check_state(0.0, &[0.1, 0.0, 0.2, 0.0]).is_ok());
/// assert!(guard.check_state(0.0, &[f64::NAN, 0.0, 0.2, 0.0]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct JidokaGuard {
    config: JidokaConfig,
}

impl JidokaGuard {
    /// Create a new Jidoka guard with given configuration.
    #[must_use]
    pub const fn new(config: JidokaConfig) -> Self {
        Self { config }
    }

    /// Get current configuration.
    #[must_use]
    pub const fn config(&self) -> &JidokaConfig {
        &self.config
    }

    /// Check a solver state for NaN/Inf.
    ///
    /// # Errors
    ///
    /// Returns `NonFiniteValue` naming the component index and time.
    pub fn check_state(&self, time: f64, y: &[f64]) -> SimResult<()> {
        if !self.config.check_finite {
            return Ok(());
        }
        match y.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(SimError::NonFiniteValue {
                location: format!("state[{i}] at t={time}"),
            }),
            None => Ok(()),
        }
    }

    /// Check a named constraint residual with graduated severity.
    ///
    /// Returns `Some(warning)` when the residual is close to the tolerance.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` for Critical or Fatal residuals.
    pub fn check_constraint(&self, name: &str, violation: f64) -> SimResult<Option<JidokaWarning>> {
        let tolerance = self.config.constraint_tolerance;
        match self
            .config
            .severity_classifier
            .classify_constraint(violation, tolerance)
        {
            ViolationSeverity::Acceptable => Ok(None),
            ViolationSeverity::Warning => Ok(Some(JidokaWarning::ConstraintApproaching {
                name: name.to_string(),
                violation,
                tolerance,
            })),
            ViolationSeverity::Critical | ViolationSeverity::Fatal => {
                Err(SimError::ConstraintViolation {
                    name: name.to_string(),
                    violation,
                    tolerance,
                })
            }
        }
    }
}
