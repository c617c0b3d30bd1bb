//! Core simulation engine.
//!
//! Drives the chaos experiment end to end:
//! - Integrate the baseline and perturbed scenarios (optionally on two
//!   scoped threads; results never depend on scheduling)
//! - Compare the two trajectories column by column (KS divergence)
//! - Measure per-column entropy of each trajectory
//! - Jidoka guards stop the line on the first numerical anomaly
//!
//! Trajectories are produced once and are read-only afterwards, so no
//! locking is involved anywhere.

pub mod jidoka;
pub mod state;

use serde::Serialize;
use tracing::info;

pub use jidoka::{JidokaConfig, JidokaGuard, JidokaWarning, SeverityClassifier, ViolationSeverity};
pub use state::{PendulumState, STATE_DIM};

use crate::analysis::{DivergenceAnalyzer, DivergenceReport, EntropyAnalyzer, EntropyReport};
use crate::config::SimConfig;
use crate::domains::physics::{IntegrationStats, Rk45Integrator};
use crate::error::{SimError, SimResult};
use crate::scenarios::pendulum::{Scenario, ScenarioRun};
use crate::trajectory::Trajectory;

/// Analysis results for one baseline/perturbed pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// KS comparison per variable, in column order.
    pub divergence: Vec<DivergenceReport>,
    /// Entropy of the baseline run per variable.
    pub baseline_entropy: Vec<EntropyReport>,
    /// Entropy of the perturbed run per variable.
    pub perturbed_entropy: Vec<EntropyReport>,
}

/// Serializable digest of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario name.
    pub name: String,
    /// Number of trajectory samples.
    pub samples: usize,
    /// BLAKE3 fingerprint of the trajectory.
    pub fingerprint: String,
    /// Solver statistics.
    pub stats: IntegrationStats,
    /// Initial mechanical energy (J).
    pub initial_energy: f64,
    /// Final mechanical energy (J).
    pub final_energy: f64,
    /// Relative energy drift.
    pub energy_drift: f64,
}

impl ScenarioSummary {
    /// Summarize a run.
    #[must_use]
    pub fn from_run(run: &ScenarioRun) -> Self {
        Self {
            name: run.name.clone(),
            samples: run.trajectory.len(),
            fingerprint: run.trajectory.fingerprint(),
            stats: run.stats,
            initial_energy: run.initial_energy,
            final_energy: run.final_energy,
            energy_drift: run.energy_drift(),
        }
    }
}

/// Serializable result of a full run (trajectories excluded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Simulation name from the configuration.
    pub simulation: String,
    /// Baseline scenario digest.
    pub baseline: ScenarioSummary,
    /// Perturbed scenario digest.
    pub perturbed: ScenarioSummary,
    /// Divergence and entropy reports.
    pub analysis: AnalysisReport,
}

impl RunReport {
    /// Render as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimError::serialization(format!("JSON serialization failed: {e}")))
    }
}

/// Full result of [`SimEngine::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Baseline run with its trajectory.
    pub baseline: ScenarioRun,
    /// Perturbed run with its trajectory.
    pub perturbed: ScenarioRun,
    /// Serializable report.
    pub report: RunReport,
}

/// Result of repeating one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReproducibilityReport {
    /// Scenario that was repeated.
    pub scenario: String,
    /// Trajectory fingerprint of each run.
    pub fingerprints: Vec<String>,
}

impl ReproducibilityReport {
    /// Whether every run produced the same trajectory bits.
    #[must_use]
    pub fn is_reproducible(&self) -> bool {
        self.fingerprints.windows(2).all(|w| w[0] == w[1])
    }
}

/// Main simulation engine.
#[derive(Debug, Clone)]
pub struct SimEngine {
    config: SimConfig,
    integrator: Rk45Integrator,
    guard: JidokaGuard,
    divergence: DivergenceAnalyzer,
    entropy: EntropyAnalyzer,
}

impl SimEngine {
    /// Create a new simulation engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` or `Config` if the configuration fails
    /// semantic validation; nothing is integrated in that case.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate_semantic()?;

        let guard = JidokaGuard::new(config.jidoka.clone());
        let integrator = Rk45Integrator::new(config.solver.to_options()).with_guard(guard.clone());
        let divergence = config.analysis.divergence_analyzer()?;
        let entropy = config.analysis.entropy_analyzer()?;

        Ok(Self {
            config,
            integrator,
            guard,
            divergence,
            entropy,
        })
    }

    /// Get configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Baseline and perturbed scenarios.
    #[must_use]
    pub fn scenarios(&self) -> (Scenario, Scenario) {
        (
            self.config.baseline_scenario(),
            self.config.perturbed_scenario(),
        )
    }

    /// Integrate one scenario over the configured span and sample count.
    ///
    /// # Errors
    ///
    /// Propagates any input, integration or Jidoka error.
    pub fn run_scenario(&self, scenario: &Scenario) -> SimResult<ScenarioRun> {
        scenario.simulate(
            self.config.time_span,
            self.config.samples,
            &self.integrator,
            &self.guard,
        )
    }

    /// Integrate both scenarios, concurrently when configured.
    ///
    /// # Errors
    ///
    /// Returns the baseline error first if both runs fail, and `Worker` if a
    /// worker thread panics.
    pub fn run_pair(&self) -> SimResult<(ScenarioRun, ScenarioRun)> {
        self.run_pair_with(self.config.output.parallel)
    }

    /// Integrate both scenarios, on two threads if `parallel`.
    ///
    /// # Errors
    ///
    /// See [`SimEngine::run_pair`].
    pub fn run_pair_with(&self, parallel: bool) -> SimResult<(ScenarioRun, ScenarioRun)> {
        let (baseline, perturbed) = self.scenarios();
        if !parallel {
            let a = self.run_scenario(&baseline)?;
            let b = self.run_scenario(&perturbed)?;
            return Ok((a, b));
        }

        std::thread::scope(|s| -> SimResult<(ScenarioRun, ScenarioRun)> {
            let worker = s.spawn(|| self.run_scenario(&perturbed));
            let a = self.run_scenario(&baseline);
            let b = worker
                .join()
                .map_err(|_| SimError::Worker(format!("scenario '{}' panicked", perturbed.name())))?;
            Ok((a?, b?))
        })
    }

    /// Run both analyzers over a trajectory pair.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for empty or unequal trajectories.
    pub fn analyze(&self, baseline: &Trajectory, perturbed: &Trajectory) -> SimResult<AnalysisReport> {
        Ok(AnalysisReport {
            divergence: self.divergence.compare(baseline, perturbed)?,
            baseline_entropy: self.entropy.analyze(baseline)?,
            perturbed_entropy: self.entropy.analyze(perturbed)?,
        })
    }

    /// Integrate both scenarios and analyze them.
    ///
    /// # Errors
    ///
    /// Propagates the first failure; no partial outcome is returned.
    pub fn run(&self) -> SimResult<RunOutcome> {
        let (baseline, perturbed) = self.run_pair()?;
        info!(
            baseline = %baseline.name,
            perturbed = %perturbed.name,
            samples = baseline.trajectory.len(),
            "scenarios integrated"
        );

        let analysis = self.analyze(&baseline.trajectory, &perturbed.trajectory)?;
        info!(
            different = analysis
                .divergence
                .iter()
                .filter(|r| r.verdict == crate::analysis::DivergenceVerdict::Different)
                .count(),
            "analysis complete"
        );

        let report = RunReport {
            simulation: self.config.simulation.name.clone(),
            baseline: ScenarioSummary::from_run(&baseline),
            perturbed: ScenarioSummary::from_run(&perturbed),
            analysis,
        };
        Ok(RunOutcome {
            baseline,
            perturbed,
            report,
        })
    }

    /// Integrate the baseline scenario `runs` times and fingerprint each result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for `runs == 0` and propagates run errors.
    pub fn verify_reproducibility(&self, runs: usize) -> SimResult<ReproducibilityReport> {
        if runs == 0 {
            return Err(SimError::invalid_parameter("runs", "at least 1 run required"));
        }
        let scenario = self.config.baseline_scenario();
        let fingerprints = (0..runs)
            .map(|_| self.run_scenario(&scenario).map(|run| run.trajectory.fingerprint()))
            .collect::<SimResult<Vec<_>>>()?;
        info!(scenario = %scenario.name(), runs, "reproducibility check finished");
        Ok(ReproducibilityReport {
            scenario: scenario.name().to_string(),
            fingerprints,
        })
    }
}
