//! Physics domain engine.
//!
//! Adaptive numerical integration of first-order ODE systems `dy/dt = f(t, y)`:
//! - Dormand-Prince 5(4) embedded Runge-Kutta pair ("RK45"), FSAL
//! - Per-step local error control with mixed absolute/relative tolerance
//! - Cubic Hermite dense output onto a caller-supplied uniform time grid
//!
//! # Step Size Control
//!
//! The 5th order solution advances the state; the difference to the embedded
//! 4th order solution estimates the local error. A step is accepted when the
//! RMS of `err_i / (atol + rtol * max(|y_i|, |y_new_i|))` is at most 1 and the
//! next step is scaled by `safety * err^(-1/5)`, clamped to
//! `[min_factor, max_factor]`.
//!
//! # Dense Output
//!
//! Accepted steps are non-uniform. Requested sample times are never forced as
//! step endpoints: each one is interpolated between the two bracketing
//! accepted steps from the state and derivative at both ends.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::jidoka::JidokaGuard;
use crate::error::{SimError, SimResult};

/// System of ordinary differential equations: `dy/dt = f(t, y)`.
///
/// Implementors carry their own parameters; the solver only ever sees this
/// fixed `(time, state) -> derivative` signature.
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side at `(t, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the derivative is numerically undefined at `(t, y)`.
    fn derivative(&self, t: f64, y: &[f64; N]) -> SimResult<[f64; N]>;
}

// Dormand-Prince 5(4) tableau.
const STAGES: usize = 7;
const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
/// 5th order weights (identical to the last row of `A`, hence FSAL).
const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
/// Difference between the 4th and 5th order weights.
const E: [f64; STAGES] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339_200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];
/// Order of the embedded error estimator.
const ERROR_ESTIMATOR_ORDER: f64 = 4.0;

/// Tolerance specification for error control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
        }
    }
}

impl Tolerances {
    /// Create tolerances.
    #[must_use]
    pub const fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    /// Error scale for one component.
    fn scale(&self, y: f64, y_new: f64) -> f64 {
        self.atol + self.rtol * y.abs().max(y_new.abs())
    }
}

/// Step-size controller (I-controller).
///
/// `h_new = h * clamp(safety * err^(-1/5), min_factor, max_factor)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepController {
    /// Safety factor (0.8-0.9 typical).
    pub safety: f64,
    /// Minimum reduction factor per step.
    pub min_factor: f64,
    /// Maximum growth factor per step.
    pub max_factor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }
}

impl StepController {
    /// Step size adjustment factor for a normalized error.
    #[must_use]
    pub fn factor(&self, error_norm: f64) -> f64 {
        if error_norm == 0.0 {
            return self.max_factor;
        }
        if !error_norm.is_finite() {
            return self.min_factor;
        }
        let factor = self.safety * error_norm.powf(-1.0 / (ERROR_ESTIMATOR_ORDER + 1.0));
        factor.clamp(self.min_factor, self.max_factor)
    }
}

/// Solver options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Error tolerances.
    pub tolerances: Tolerances,
    /// Step size controller.
    pub controller: StepController,
    /// Initial step; chosen automatically when `None`.
    pub first_step: Option<f64>,
    /// Upper bound on the step size; unbounded when `None`.
    pub max_step: Option<f64>,
    /// Maximum number of step attempts (accepted + rejected).
    pub max_steps: u64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            controller: StepController::default(),
            first_step: None,
            max_step: None,
            max_steps: 1_000_000,
        }
    }
}

impl SolverOptions {
    /// Validate solver options.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for non-positive tolerances, an unusable
    /// controller, or non-positive step bounds.
    pub fn validate(&self) -> SimResult<()> {
        let tol = &self.tolerances;
        if !(tol.rtol.is_finite() && tol.rtol > 0.0) {
            return Err(SimError::invalid_parameter(
                "solver.rtol",
                format!("must be positive, got {}", tol.rtol),
            ));
        }
        if !(tol.atol.is_finite() && tol.atol > 0.0) {
            return Err(SimError::invalid_parameter(
                "solver.atol",
                format!("must be positive, got {}", tol.atol),
            ));
        }
        let ctrl = &self.controller;
        if !(ctrl.safety > 0.0 && ctrl.safety <= 1.0) {
            return Err(SimError::invalid_parameter(
                "solver.safety",
                format!("must be in (0, 1], got {}", ctrl.safety),
            ));
        }
        if !(ctrl.min_factor > 0.0 && ctrl.min_factor < 1.0) {
            return Err(SimError::invalid_parameter(
                "solver.min_factor",
                format!("must be in (0, 1), got {}", ctrl.min_factor),
            ));
        }
        if !(ctrl.max_factor > 1.0 && ctrl.max_factor.is_finite()) {
            return Err(SimError::invalid_parameter(
                "solver.max_factor",
                format!("must be finite and > 1, got {}", ctrl.max_factor),
            ));
        }
        for (name, value) in [("solver.first_step", self.first_step), ("solver.max_step", self.max_step)] {
            if let Some(h) = value {
                if !(h.is_finite() && h > 0.0) {
                    return Err(SimError::invalid_parameter(
                        name,
                        format!("must be positive, got {h}"),
                    ));
                }
            }
        }
        if self.max_steps == 0 {
            return Err(SimError::invalid_parameter(
                "solver.max_steps",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Integration statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStats {
    /// Total number of right-hand side evaluations.
    pub fn_evals: u64,
    /// Number of accepted steps.
    pub accepted_steps: u64,
    /// Number of rejected steps.
    pub rejected_steps: u64,
}

/// Solution resampled onto a uniform grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseSolution<const N: usize> {
    /// Sample times, evenly spaced, first and last equal to the span ends.
    pub times: Vec<f64>,
    /// State at each sample time.
    pub states: Vec<[f64; N]>,
    /// Solver statistics.
    pub stats: IntegrationStats,
}

impl<const N: usize> DenseSolution<N> {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the solution holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// `n` evenly spaced points over `[start, end]`, last point pinned to `end`.
#[must_use]
pub fn uniform_grid(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let span = end - start;
            let last = (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + span * (i as f64 / last)).collect();
            grid[n - 1] = end;
            grid
        }
    }
}

/// Cubic Hermite interpolation on `[t0, t0 + h]` at `t`.
#[must_use]
pub fn hermite_interpolate<const N: usize>(
    t0: f64,
    h: f64,
    y0: &[f64; N],
    f0: &[f64; N],
    y1: &[f64; N],
    f1: &[f64; N],
    t: f64,
) -> [f64; N] {
    let s = (t - t0) / h;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = h00 * y0[i] + h10 * h * f0[i] + h01 * y1[i] + h11 * h * f1[i];
    }
    out
}

fn rms<const N: usize>(values: impl Iterator<Item = f64>) -> f64 {
    let sum: f64 = values.map(|v| v * v).sum();
    (sum / N as f64).sqrt()
}

/// Smallest step the solver may take at time `t`.
fn min_step_at(t: f64) -> f64 {
    10.0 * f64::EPSILON * t.abs().max(1.0)
}

/// Adaptive Dormand-Prince 5(4) integrator with dense output.
///
/// # Example
///
/// ```rust
/// use pendular::domains::physics::{OdeSystem, Rk45Integrator};
/// use pendular::SimResult;
///
/// struct Decay;
/// impl OdeSystem<1> for Decay {
///     fn derivative(&self, _t: f64, y: &[f64; 1]) -> SimResult<[f64; 1]> {
///         Ok([-y[0]])
///     }
/// }
///
/// let solution = Rk45Integrator::default()
///     .integrate(&Decay, [1.0], 0.0, 1.0, 11)
///     .unwrap();
/// assert_eq!(solution.len(), 11);
/// assert!((solution.states[10][0] - (-1.0f64).exp()).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rk45Integrator {
    options: SolverOptions,
    guard: JidokaGuard,
}

impl Rk45Integrator {
    /// Create an integrator with the given options.
    #[must_use]
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            guard: JidokaGuard::default(),
        }
    }

    /// Replace the Jidoka guard run on every accepted state.
    #[must_use]
    pub fn with_guard(mut self, guard: JidokaGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Solver options.
    #[must_use]
    pub const fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Integrate `system` from `y0` over `[t0, t1]` and sample `samples`
    /// evenly spaced points.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for `t1 <= t0`, non-finite span ends, `samples < 2`,
    ///   non-finite `y0` or invalid solver options (before any step is taken)
    /// - `Integration` when the step size underflows or `max_steps` is exhausted
    /// - any error raised by `system.derivative` or the Jidoka guard
    pub fn integrate<S, const N: usize>(
        &self,
        system: &S,
        y0: [f64; N],
        t0: f64,
        t1: f64,
        samples: usize,
    ) -> SimResult<DenseSolution<N>>
    where
        S: OdeSystem<N> + ?Sized,
    {
        self.validate_inputs(&y0, t0, t1, samples)?;

        let grid = uniform_grid(t0, t1, samples);
        let mut times = Vec::with_capacity(samples);
        let mut states = Vec::with_capacity(samples);
        times.push(grid[0]);
        states.push(y0);
        let mut next = 1;

        let mut stats = IntegrationStats::default();
        let mut t = t0;
        let mut y = y0;
        let mut f = system.derivative(t, &y)?;
        stats.fn_evals += 1;

        let max_step = self.options.max_step.unwrap_or(f64::INFINITY);
        let first_step = match self.options.first_step {
            Some(h) => h,
            None => self.initial_step(system, t0, &y0, &f, t1 - t0, &mut stats)?,
        };
        let mut h = first_step.min(max_step);

        let mut attempts: u64 = 0;
        while next < samples {
            let min_step = min_step_at(t);
            let mut step_rejected = false;

            loop {
                if attempts >= self.options.max_steps {
                    return Err(SimError::integration(
                        t,
                        h,
                        format!("maximum number of steps ({}) exceeded", self.options.max_steps),
                    ));
                }
                attempts += 1;

                let remaining = t1 - t;
                if h < min_step && remaining > min_step {
                    return Err(SimError::integration(
                        t,
                        h,
                        format!("step size fell below the floor {min_step:.3e} without meeting tolerance"),
                    ));
                }
                // A leftover shorter than the floor is absorbed into this step.
                let last_step = h >= remaining - min_step;
                let h_try = if last_step { remaining } else { h };

                let (y_new, f_new, error_norm) = self.try_step(system, t, &y, &f, h_try, &mut stats)?;

                if error_norm <= 1.0 {
                    let mut factor = self.options.controller.factor(error_norm);
                    if step_rejected {
                        factor = factor.min(1.0);
                    }
                    let t_new = if last_step { t1 } else { t + h_try };
                    self.guard.check_state(t_new, &y_new)?;
                    stats.accepted_steps += 1;

                    while next < samples && grid[next] <= t_new {
                        let tq = grid[next];
                        let yq = if tq == t_new {
                            y_new
                        } else {
                            hermite_interpolate(t, t_new - t, &y, &f, &y_new, &f_new, tq)
                        };
                        times.push(tq);
                        states.push(yq);
                        next += 1;
                    }

                    t = t_new;
                    y = y_new;
                    f = f_new;
                    h = (h_try * factor).min(max_step);
                    break;
                }

                stats.rejected_steps += 1;
                step_rejected = true;
                h = h_try * self.options.controller.factor(error_norm).min(1.0);
            }
        }

        debug!(
            fn_evals = stats.fn_evals,
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            samples,
            "integration finished"
        );

        Ok(DenseSolution {
            times,
            states,
            stats,
        })
    }

    fn validate_inputs<const N: usize>(
        &self,
        y0: &[f64; N],
        t0: f64,
        t1: f64,
        samples: usize,
    ) -> SimResult<()> {
        if !(t0.is_finite() && t1.is_finite()) {
            return Err(SimError::invalid_parameter(
                "time_span",
                format!("ends must be finite, got [{t0}, {t1}]"),
            ));
        }
        if t1 <= t0 {
            return Err(SimError::invalid_parameter(
                "time_span",
                format!("end must exceed start, got [{t0}, {t1}]"),
            ));
        }
        if samples < 2 {
            return Err(SimError::invalid_parameter(
                "samples",
                format!("at least 2 samples required, got {samples}"),
            ));
        }
        if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
            return Err(SimError::invalid_parameter(
                format!("initial_state[{i}]"),
                format!("must be finite, got {}", y0[i]),
            ));
        }
        self.options.validate()
    }

    /// One Dormand-Prince step. Returns the 5th order state, its derivative
    /// (the FSAL stage) and the normalized error.
    fn try_step<S, const N: usize>(
        &self,
        system: &S,
        t: f64,
        y: &[f64; N],
        f: &[f64; N],
        h: f64,
        stats: &mut IntegrationStats,
    ) -> SimResult<([f64; N], [f64; N], f64)>
    where
        S: OdeSystem<N> + ?Sized,
    {
        let mut k = [[0.0; N]; STAGES];
        k[0] = *f;

        for s in 1..STAGES - 1 {
            let mut ys = *y;
            for (i, yi) in ys.iter_mut().enumerate() {
                let mut acc = 0.0;
                for j in 0..s {
                    acc += A[s][j] * k[j][i];
                }
                *yi += h * acc;
            }
            k[s] = system.derivative(t + C[s] * h, &ys)?;
            stats.fn_evals += 1;
        }

        let mut y_new = *y;
        for (i, yi) in y_new.iter_mut().enumerate() {
            let mut acc = 0.0;
            for s in 0..STAGES - 1 {
                acc += B[s] * k[s][i];
            }
            *yi += h * acc;
        }
        let f_new = system.derivative(t + h, &y_new)?;
        stats.fn_evals += 1;
        k[STAGES - 1] = f_new;

        let tol = &self.options.tolerances;
        let error_norm = rms::<N>((0..N).map(|i| {
            let mut err = 0.0;
            for s in 0..STAGES {
                err += E[s] * k[s][i];
            }
            h * err / tol.scale(y[i], y_new[i])
        }));

        let error_norm = if error_norm.is_nan() {
            f64::INFINITY
        } else {
            error_norm
        };
        Ok((y_new, f_new, error_norm))
    }

    /// Hairer-Wanner starting step heuristic.
    fn initial_step<S, const N: usize>(
        &self,
        system: &S,
        t0: f64,
        y0: &[f64; N],
        f0: &[f64; N],
        interval: f64,
        stats: &mut IntegrationStats,
    ) -> SimResult<f64>
    where
        S: OdeSystem<N> + ?Sized,
    {
        let tol = &self.options.tolerances;
        let scale = |v: f64| tol.atol + v.abs() * tol.rtol;

        let d0 = rms::<N>((0..N).map(|i| y0[i] / scale(y0[i])));
        let d1 = rms::<N>((0..N).map(|i| f0[i] / scale(y0[i])));
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(interval);

        let mut y1 = *y0;
        for i in 0..N {
            y1[i] += h0 * f0[i];
        }
        let f1 = system.derivative(t0 + h0, &y1)?;
        stats.fn_evals += 1;

        let d2 = rms::<N>((0..N).map(|i| (f1[i] - f0[i]) / scale(y0[i]))) / h0;
        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ESTIMATOR_ORDER + 1.0))
        };

        Ok((100.0 * h0).min(h1).min(interval))
    }
}
