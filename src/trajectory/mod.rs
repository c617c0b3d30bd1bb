//! Sampled double pendulum trajectories.
//!
//! A [`Trajectory`] is the combined table produced for one scenario: the
//! angular state resampled onto the uniform output grid, joined with the
//! Cartesian bob positions from forward kinematics. Columns follow the fixed
//! [`Variable`] schema, so every per-variable analysis loops over
//! [`Variable::ALL`] instead of discovering columns at runtime.
//!
//! Trajectories are immutable once built.

pub mod export;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domains::physics::DenseSolution;
use crate::engine::jidoka::{JidokaGuard, JidokaWarning};
use crate::engine::state::{PendulumState, STATE_DIM};
use crate::error::SimResult;
use crate::scenarios::pendulum::PendulumParams;

/// One column of the trajectory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Sample time (s).
    T,
    /// Inner bob x position (m).
    X1,
    /// Inner bob y position (m).
    Y1,
    /// Outer bob x position (m).
    X2,
    /// Outer bob y position (m).
    Y2,
    /// Inner link angle (rad).
    Theta1,
    /// Outer link angle (rad).
    Theta2,
    /// Inner link angular velocity (rad/s).
    Omega1,
    /// Outer link angular velocity (rad/s).
    Omega2,
}

impl Variable {
    /// Every column, in table order.
    pub const ALL: [Self; 9] = [
        Self::T,
        Self::X1,
        Self::Y1,
        Self::X2,
        Self::Y2,
        Self::Theta1,
        Self::Theta2,
        Self::Omega1,
        Self::Omega2,
    ];

    /// Column header name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::T => "t",
            Self::X1 => "x1",
            Self::Y1 => "y1",
            Self::X2 => "x2",
            Self::Y2 => "y2",
            Self::Theta1 => "theta1",
            Self::Theta2 => "theta2",
            Self::Omega1 => "omega1",
            Self::Omega2 => "omega2",
        }
    }

    /// Look up a column by header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cartesian bob positions `(x1, y1, x2, y2)` for link angles `θ1`, `θ2`.
///
/// The pivot sits at the origin with `y` pointing up, so a hanging pendulum
/// has negative `y`.
#[must_use]
pub fn forward_kinematics(theta1: f64, theta2: f64, l1: f64, l2: f64) -> (f64, f64, f64, f64) {
    let (s1, c1) = theta1.sin_cos();
    let (s2, c2) = theta2.sin_cos();
    let x1 = l1 * s1;
    let y1 = -l1 * c1;
    let x2 = x1 + l2 * s2;
    let y2 = y1 - l2 * c2;
    (x1, y1, x2, y2)
}

/// Floating-point rounding bound on `|r² - L²|` for positions computed by
/// [`forward_kinematics`].
///
/// The outer bob is placed relative to the inner one, so recovering the
/// outer link from `x2 - x1` loses precision on the scale of `L1 + L2`.
#[must_use]
pub fn rounding_bound(l1: f64, l2: f64) -> f64 {
    16.0 * f64::EPSILON * (l1 + l2) * (l1 + l2)
}

/// One row of the trajectory table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Sample time (s).
    pub t: f64,
    /// Inner bob x (m).
    pub x1: f64,
    /// Inner bob y (m).
    pub y1: f64,
    /// Outer bob x (m).
    pub x2: f64,
    /// Outer bob y (m).
    pub y2: f64,
    /// Inner link angle (rad).
    pub theta1: f64,
    /// Outer link angle (rad).
    pub theta2: f64,
    /// Inner link angular velocity (rad/s).
    pub omega1: f64,
    /// Outer link angular velocity (rad/s).
    pub omega2: f64,
}

impl TrajectorySample {
    /// Transform an angular state at time `t` into a full table row.
    #[must_use]
    pub fn from_state(t: f64, state: &PendulumState, params: &PendulumParams) -> Self {
        let (x1, y1, x2, y2) = forward_kinematics(state.theta1, state.theta2, params.l1, params.l2);
        Self {
            t,
            x1,
            y1,
            x2,
            y2,
            theta1: state.theta1,
            theta2: state.theta2,
            omega1: state.omega1,
            omega2: state.omega2,
        }
    }

    /// Value of one column.
    #[must_use]
    pub const fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::T => self.t,
            Variable::X1 => self.x1,
            Variable::Y1 => self.y1,
            Variable::X2 => self.x2,
            Variable::Y2 => self.y2,
            Variable::Theta1 => self.theta1,
            Variable::Theta2 => self.theta2,
            Variable::Omega1 => self.omega1,
            Variable::Omega2 => self.omega2,
        }
    }

    /// Values in [`Variable::ALL`] order.
    #[must_use]
    pub const fn to_row(&self) -> [f64; 9] {
        [
            self.t,
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.theta1,
            self.theta2,
            self.omega1,
            self.omega2,
        ]
    }

    /// Build a sample from values in [`Variable::ALL`] order.
    #[must_use]
    pub const fn from_row(row: [f64; 9]) -> Self {
        Self {
            t: row[0],
            x1: row[1],
            y1: row[2],
            x2: row[3],
            y2: row[4],
            theta1: row[5],
            theta2: row[6],
            omega1: row[7],
            omega2: row[8],
        }
    }

    /// Angular state of this sample.
    #[must_use]
    pub const fn state(&self) -> PendulumState {
        PendulumState::new(self.theta1, self.omega1, self.theta2, self.omega2)
    }
}

/// Immutable table of trajectory samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    /// Wrap already transformed samples.
    #[must_use]
    pub fn from_samples(samples: Vec<TrajectorySample>) -> Self {
        Self { samples }
    }

    /// Apply forward kinematics to every sample of a solver output.
    #[must_use]
    pub fn from_solution(solution: &DenseSolution<STATE_DIM>, params: &PendulumParams) -> Self {
        let samples = solution
            .times
            .iter()
            .zip(&solution.states)
            .map(|(&t, y)| TrajectorySample::from_state(t, &PendulumState::from_array(*y), params))
            .collect();
        Self { samples }
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All rows in time order.
    #[must_use]
    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// One column as a vector.
    #[must_use]
    pub fn column(&self, variable: Variable) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(variable)).collect()
    }

    /// Span covered by the samples, `end - start`.
    #[must_use]
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.t - first.t,
            _ => 0.0,
        }
    }

    /// Check both link-length constraints at every sample.
    ///
    /// The residual is `|r² - L²|` for each link, less the rounding bound of
    /// [`rounding_bound`] for the given lengths; residuals near the
    /// guard's tolerance come back as warnings.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` for the first sample whose residual
    /// exceeds the tolerance.
    pub fn check_kinematics(
        &self,
        params: &PendulumParams,
        guard: &JidokaGuard,
    ) -> SimResult<Vec<JidokaWarning>> {
        let l1_sq = params.l1 * params.l1;
        let l2_sq = params.l2 * params.l2;
        let slack = rounding_bound(params.l1, params.l2);
        let excess = |residual: f64| (residual.abs() - slack).max(0.0);
        let mut warnings = Vec::new();
        for s in &self.samples {
            let r1_sq = s.x1 * s.x1 + s.y1 * s.y1;
            let dx = s.x2 - s.x1;
            let dy = s.y2 - s.y1;
            let r2_sq = dx * dx + dy * dy;
            warnings.extend(guard.check_constraint("link1_length", excess(r1_sq - l1_sq))?);
            warnings.extend(guard.check_constraint("link2_length", excess(r2_sq - l2_sq))?);
        }
        Ok(warnings)
    }

    /// BLAKE3 digest (hex) over the bit patterns of every value, row by row.
    ///
    /// Two trajectories share a fingerprint only if they are bit-identical.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.samples.len() as u64).to_le_bytes());
        for sample in &self.samples {
            for value in sample.to_row() {
                hasher.update(&value.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
