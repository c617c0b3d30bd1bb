//! Double pendulum scenario.
//!
//! Two point masses on rigid, massless links swinging in a vertical plane.
//! Angles are measured from the downward vertical, so `θ = 0` hangs straight
//! down and `θ = π` is inverted.
//!
//! The equations of motion come from the Lagrangian and reduce, at every
//! instant, to a linear 2x2 solve for the two angular accelerations:
//!
//! ```text
//! a = (m1+m2)·L1          b = m2·L2·cos(θ1−θ2)
//! c = m2·L1·cos(θ1−θ2)    d = m2·L2
//! e = −m2·L2·ω2²·sin(θ1−θ2) − g·(m1+m2)·sin θ1
//! f =  m2·L1·ω1²·sin(θ1−θ2) − m2·g·sin θ2
//!
//! α1 = (e·d − b·f) / (a·d − c·b)
//! α2 = (a·f − c·e) / (a·d − c·b)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::domains::physics::{IntegrationStats, OdeSystem, Rk45Integrator};
use crate::engine::jidoka::{JidokaGuard, JidokaWarning};
use crate::engine::state::{PendulumState, STATE_DIM};
use crate::error::{SimError, SimResult};
use crate::trajectory::Trajectory;

/// Relative size of `a·d − c·b` (against `a·d`) below which the
/// acceleration solve is treated as singular.
pub const SINGULARITY_RATIO: f64 = 1e-12;

/// Physical parameters of the double pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PendulumParams {
    /// Inner bob mass (kg).
    #[validate(range(exclusive_min = 0.0))]
    pub m1: f64,
    /// Outer bob mass (kg).
    #[validate(range(exclusive_min = 0.0))]
    pub m2: f64,
    /// Inner link length (m).
    #[validate(range(exclusive_min = 0.0))]
    pub l1: f64,
    /// Outer link length (m).
    #[validate(range(exclusive_min = 0.0))]
    pub l2: f64,
    /// Gravitational acceleration (m/s²).
    #[validate(range(exclusive_min = 0.0))]
    pub g: f64,
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            m1: 2.0,
            m2: 1.0,
            l1: 2.0,
            l2: 1.0,
            g: 9.8,
        }
    }
}

impl PendulumParams {
    /// Create a parameter set.
    #[must_use]
    pub const fn new(m1: f64, m2: f64, l1: f64, l2: f64, g: f64) -> Self {
        Self { m1, m2, l1, l2, g }
    }

    /// Fail fast on non-positive or non-finite parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first offending field.
    pub fn ensure_valid(&self) -> SimResult<()> {
        for (name, value) in [
            ("m1", self.m1),
            ("m2", self.m2),
            ("l1", self.l1),
            ("l2", self.l2),
            ("g", self.g),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::invalid_parameter(
                    format!("parameters.{name}"),
                    format!("must be positive and finite, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Kinetic energy of `state` (J).
    #[must_use]
    pub fn kinetic_energy(&self, state: &PendulumState) -> f64 {
        let Self { m1, m2, l1, l2, .. } = *self;
        0.5 * (m1 + m2) * l1 * l1 * state.omega1 * state.omega1
            + 0.5 * m2 * l2 * l2 * state.omega2 * state.omega2
            + m2 * l1 * l2 * state.omega1 * state.omega2 * state.delta().cos()
    }

    /// Potential energy of `state` relative to the pivot height (J).
    #[must_use]
    pub fn potential_energy(&self, state: &PendulumState) -> f64 {
        let Self { m1, m2, l1, l2, g } = *self;
        -(m1 + m2) * g * l1 * state.theta1.cos() - m2 * g * l2 * state.theta2.cos()
    }

    /// Total mechanical energy of `state` (J).
    #[must_use]
    pub fn total_energy(&self, state: &PendulumState) -> f64 {
        self.kinetic_energy(state) + self.potential_energy(state)
    }
}

/// Equations of motion: derivative `(ω1, α1, ω2, α2)` of `state`.
///
/// The system is autonomous; `t` only identifies the evaluation in errors.
///
/// # Errors
///
/// Returns `SingularMassMatrix` when `a·d − c·b` is numerically zero
/// relative to `a·d`.
pub fn equations_of_motion(
    t: f64,
    state: &PendulumState,
    params: &PendulumParams,
) -> SimResult<[f64; STATE_DIM]> {
    let PendulumParams { m1, m2, l1, l2, g } = *params;
    let (sin_d, cos_d) = state.delta().sin_cos();

    let a = (m1 + m2) * l1;
    let b = m2 * l2 * cos_d;
    let c = m2 * l1 * cos_d;
    let d = m2 * l2;
    let e = -m2 * l2 * state.omega2 * state.omega2 * sin_d - g * (m1 + m2) * state.theta1.sin();
    let f = m2 * l1 * state.omega1 * state.omega1 * sin_d - m2 * g * state.theta2.sin();

    let denominator = a * d - c * b;
    if !denominator.is_finite() || denominator.abs() <= SINGULARITY_RATIO * (a * d).abs() {
        return Err(SimError::SingularMassMatrix {
            time: t,
            denominator,
        });
    }

    let alpha1 = (e * d - b * f) / denominator;
    let alpha2 = (a * f - c * e) / denominator;
    Ok([state.omega1, alpha1, state.omega2, alpha2])
}

/// The double pendulum as an ODE system for the adaptive solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulumSystem {
    params: PendulumParams,
}

impl DoublePendulumSystem {
    /// Create a system with validated parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for non-positive or non-finite parameters.
    pub fn new(params: PendulumParams) -> SimResult<Self> {
        params.ensure_valid()?;
        Ok(Self { params })
    }

    /// Physical parameters.
    #[must_use]
    pub const fn params(&self) -> &PendulumParams {
        &self.params
    }
}

impl OdeSystem<STATE_DIM> for DoublePendulumSystem {
    fn derivative(&self, t: f64, y: &[f64; STATE_DIM]) -> SimResult<[f64; STATE_DIM]> {
        equations_of_motion(t, &PendulumState::from_array(*y), &self.params)
    }
}

/// Time span `[start, end]` of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSpan {
    /// Start time (s).
    #[serde(default)]
    pub start: f64,
    /// End time (s).
    pub end: f64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 10.0,
        }
    }
}

impl TimeSpan {
    /// Span `[0, end]`.
    #[must_use]
    pub const fn until(end: f64) -> Self {
        Self { start: 0.0, end }
    }

    /// Length of the span.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Reject non-finite or empty spans.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless `start < end` and both are finite.
    pub fn ensure_valid(&self) -> SimResult<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.end <= self.start {
            return Err(SimError::invalid_parameter(
                "time_span",
                format!(
                    "expected finite start < end, got [{}, {}]",
                    self.start, self.end
                ),
            ));
        }
        Ok(())
    }
}

/// A named initial condition paired with physical parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: String,
    initial_state: PendulumState,
    params: PendulumParams,
}

impl Scenario {
    /// Create a scenario.
    #[must_use]
    pub fn new(name: impl Into<String>, initial_state: PendulumState, params: PendulumParams) -> Self {
        Self {
            name: name.into(),
            initial_state,
            params,
        }
    }

    /// Derive a scenario sharing these parameters with a shifted initial state.
    #[must_use]
    pub fn perturbed(&self, name: impl Into<String>, delta: &PendulumState) -> Self {
        Self::new(name, self.initial_state.perturbed(delta), self.params)
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial state.
    #[must_use]
    pub const fn initial_state(&self) -> &PendulumState {
        &self.initial_state
    }

    /// Physical parameters.
    #[must_use]
    pub const fn params(&self) -> &PendulumParams {
        &self.params
    }

    /// Integrate the scenario and convert it to a Cartesian trajectory.
    ///
    /// Parameters, initial state, span and sample count are all checked
    /// before the first derivative evaluation.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for unusable inputs
    /// - `Integration`, `SingularMassMatrix` or `NonFiniteValue` from the solver
    /// - `ConstraintViolation` when a sample breaks the link-length constraint
    pub fn simulate(
        &self,
        span: TimeSpan,
        samples: usize,
        integrator: &Rk45Integrator,
        guard: &JidokaGuard,
    ) -> SimResult<ScenarioRun> {
        let system = DoublePendulumSystem::new(self.params)?;
        self.initial_state.validate()?;
        span.ensure_valid()?;

        info!(scenario = %self.name, samples, end = span.end, "integrating scenario");
        let solution = integrator.integrate(
            &system,
            self.initial_state.to_array(),
            span.start,
            span.end,
            samples,
        )?;

        let trajectory = Trajectory::from_solution(&solution, &self.params);
        for warning in trajectory.check_kinematics(&self.params, guard)? {
            let JidokaWarning::ConstraintApproaching {
                name,
                violation,
                tolerance,
            } = warning;
            warn!(scenario = %self.name, constraint = %name, violation, tolerance, "kinematic residual approaching tolerance");
        }

        let initial_energy = self.params.total_energy(&self.initial_state);
        let final_energy = solution
            .states
            .last()
            .map_or(initial_energy, |y| self.params.total_energy(&PendulumState::from_array(*y)));

        Ok(ScenarioRun {
            name: self.name.clone(),
            trajectory,
            stats: solution.stats,
            initial_energy,
            final_energy,
        })
    }
}

/// Result of integrating one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    /// Scenario name.
    pub name: String,
    /// Sampled trajectory.
    pub trajectory: Trajectory,
    /// Solver statistics.
    pub stats: IntegrationStats,
    /// Mechanical energy of the initial state.
    pub initial_energy: f64,
    /// Mechanical energy of the final sample.
    pub final_energy: f64,
}

impl ScenarioRun {
    /// Relative energy drift over the run.
    ///
    /// Informational only: the solver is not energy-conserving.
    #[must_use]
    pub fn energy_drift(&self) -> f64 {
        (self.final_energy - self.initial_energy).abs() / self.initial_energy.abs().max(f64::EPSILON)
    }
}
