//! Double pendulum state.
//!
//! The state is the quadruple `(θ1, ω1, θ2, ω2)`: inner and outer link angles
//! measured from the downward vertical, followed by their angular velocities.
//! The solver sees it as a flat `[f64; 4]` in that order.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Dimension of the double pendulum state vector.
pub const STATE_DIM: usize = 4;

/// Instantaneous state of the two-link pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PendulumState {
    /// Inner link angle (rad).
    pub theta1: f64,
    /// Inner link angular velocity (rad/s).
    pub omega1: f64,
    /// Outer link angle (rad).
    pub theta2: f64,
    /// Outer link angular velocity (rad/s).
    pub omega2: f64,
}

impl PendulumState {
    /// Create a new state.
    #[must_use]
    pub const fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// State at rest with both links hanging straight down.
    #[must_use]
    pub const fn at_rest() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Build a state from the solver layout `[θ1, ω1, θ2, ω2]`.
    #[must_use]
    pub const fn from_array(y: [f64; STATE_DIM]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    /// Solver layout `[θ1, ω1, θ2, ω2]`.
    #[must_use]
    pub const fn to_array(&self) -> [f64; STATE_DIM] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    /// Return a copy with every component shifted by `delta` (same layout).
    #[must_use]
    pub fn perturbed(&self, delta: &Self) -> Self {
        Self::new(
            self.theta1 + delta.theta1,
            self.omega1 + delta.omega1,
            self.theta2 + delta.theta2,
            self.omega2 + delta.omega2,
        )
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Reject NaN/Inf components before any integration work.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first non-finite component.
    pub fn validate(&self) -> SimResult<()> {
        const NAMES: [&str; STATE_DIM] = ["theta1", "omega1", "theta2", "omega2"];
        for (name, value) in NAMES.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(SimError::invalid_parameter(
                    format!("initial_state.{name}"),
                    format!("must be finite, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Angle difference `θ1 - θ2`, the argument of every coupling term.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.theta1 - self.theta2
    }
}

impl From<[f64; STATE_DIM]> for PendulumState {
    fn from(y: [f64; STATE_DIM]) -> Self {
        Self::from_array(y)
    }
}

impl From<PendulumState> for [f64; STATE_DIM] {
    fn from(state: PendulumState) -> Self {
        state.to_array()
    }
}
