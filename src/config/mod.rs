//! Configuration system with YAML schema and validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Declarative validation via `validator`
//! - Runtime semantic validation before any integration step
//!
//! [`SimConfig::default`] is the reference chaos experiment: `m1 = 2`,
//! `m2 = 1`, `L1 = 2`, `L2 = 1`, `g = 9.8`, baseline `(π, 0, 1.57, 0)`
//! against perturbed `(π, 0.001, 1.57, 0.001)`, 10000 samples over `[0, 10]`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::analysis::{DivergenceAnalyzer, EntropyAnalyzer, EntropyThresholds};
use crate::domains::physics::{SolverOptions, StepController, Tolerances};
use crate::engine::jidoka::JidokaConfig;
use crate::engine::state::PendulumState;
use crate::error::{SimError, SimResult};
use crate::scenarios::pendulum::{PendulumParams, Scenario, TimeSpan};

/// Top-level simulation configuration.
///
/// Loaded from YAML files with full schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Simulation metadata.
    #[validate(nested)]
    #[serde(default)]
    pub simulation: SimulationMeta,

    /// Physical parameters shared by both scenarios.
    #[validate(nested)]
    #[serde(default)]
    pub parameters: PendulumParams,

    /// Reference initial condition.
    #[validate(nested)]
    #[serde(default = "default_baseline")]
    pub baseline: ScenarioConfig,

    /// Slightly shifted initial condition.
    #[validate(nested)]
    #[serde(default = "default_perturbed")]
    pub perturbed: ScenarioConfig,

    /// Integration span.
    #[serde(default)]
    pub time_span: TimeSpan,

    /// Number of evenly spaced output samples.
    #[validate(range(min = 2))]
    #[serde(default = "default_samples")]
    pub samples: usize,

    /// Adaptive solver settings.
    #[validate(nested)]
    #[serde(default)]
    pub solver: SolverConfig,

    /// Analyzer settings.
    #[validate(nested)]
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Jidoka (stop-on-error) configuration.
    #[serde(default)]
    pub jidoka: JidokaConfig,

    /// Output locations.
    #[validate(nested)]
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

const fn default_samples() -> usize {
    10_000
}

fn default_baseline() -> ScenarioConfig {
    ScenarioConfig::new("original", PendulumState::new(std::f64::consts::PI, 0.0, 1.57, 0.0))
}

fn default_perturbed() -> ScenarioConfig {
    ScenarioConfig::new(
        "perturbed",
        PendulumState::new(std::f64::consts::PI, 0.001, 1.57, 0.001),
    )
}

impl SimConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;

        // Physical inputs first, so bad parameters surface as InvalidParameter
        config.validate_semantic()?;

        // Poka-Yoke: remaining schema constraints
        config.validate()?;

        Ok(config)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the configuration cannot be encoded.
    pub fn to_yaml(&self) -> SimResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SimError::serialization(format!("YAML serialization failed: {e}")))
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Validate semantic constraints beyond schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for unusable physical or numerical inputs
    /// and `Config` for inconsistent settings.
    pub fn validate_semantic(&self) -> SimResult<()> {
        self.parameters.ensure_valid()?;
        self.baseline.initial_state.validate()?;
        self.perturbed.initial_state.validate()?;
        self.time_span.ensure_valid()?;
        if self.samples < 2 {
            return Err(SimError::invalid_parameter(
                "samples",
                format!("at least 2 samples required, got {}", self.samples),
            ));
        }
        self.solver.to_options().validate()?;
        self.analysis.divergence_analyzer()?;
        self.analysis.entropy_analyzer()?;

        let tol = self.jidoka.constraint_tolerance;
        if !(tol.is_finite() && tol > 0.0) {
            return Err(SimError::config(format!(
                "Jidoka constraint tolerance must be positive, got {tol}"
            )));
        }
        let fraction = self.jidoka.severity_classifier.warning_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(SimError::config(format!(
                "Jidoka warning fraction must be in (0, 1], got {fraction}"
            )));
        }

        // Report file names are derived from scenario names.
        if self.baseline.name == self.perturbed.name {
            return Err(SimError::config(format!(
                "Scenario names must differ, both are '{}'",
                self.baseline.name
            )));
        }

        Ok(())
    }

    /// Baseline scenario.
    #[must_use]
    pub fn baseline_scenario(&self) -> Scenario {
        self.baseline.to_scenario(&self.parameters)
    }

    /// Perturbed scenario.
    #[must_use]
    pub fn perturbed_scenario(&self) -> Scenario {
        self.perturbed.to_scenario(&self.parameters)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            simulation: SimulationMeta::default(),
            parameters: PendulumParams::default(),
            baseline: default_baseline(),
            perturbed: default_perturbed(),
            time_span: TimeSpan::default(),
            samples: default_samples(),
            solver: SolverConfig::default(),
            analysis: AnalysisConfig::default(),
            jidoka: JidokaConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SimConfigBuilder {
    parameters: Option<PendulumParams>,
    baseline: Option<PendulumState>,
    perturbed: Option<PendulumState>,
    time_span: Option<TimeSpan>,
    samples: Option<usize>,
    tolerances: Option<Tolerances>,
    jidoka: Option<JidokaConfig>,
    parallel: Option<bool>,
    output_dir: Option<PathBuf>,
}

impl SimConfigBuilder {
    /// Set the physical parameters.
    #[must_use]
    pub const fn parameters(mut self, parameters: PendulumParams) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the baseline initial state.
    #[must_use]
    pub const fn baseline_state(mut self, state: PendulumState) -> Self {
        self.baseline = Some(state);
        self
    }

    /// Set the perturbed initial state.
    #[must_use]
    pub const fn perturbed_state(mut self, state: PendulumState) -> Self {
        self.perturbed = Some(state);
        self
    }

    /// Integrate over `[0, end]`.
    #[must_use]
    pub const fn duration(mut self, end: f64) -> Self {
        self.time_span = Some(TimeSpan::until(end));
        self
    }

    /// Set the number of output samples.
    #[must_use]
    pub const fn samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Set the solver tolerances.
    #[must_use]
    pub const fn tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.tolerances = Some(Tolerances::new(rtol, atol));
        self
    }

    /// Set Jidoka configuration.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JidokaConfig doesn't impl Copy
    pub fn jidoka(mut self, config: JidokaConfig) -> Self {
        self.jidoka = Some(config);
        self
    }

    /// Run the two scenarios on separate threads.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SimConfig {
        let mut config = SimConfig::default();

        if let Some(parameters) = self.parameters {
            config.parameters = parameters;
        }
        if let Some(state) = self.baseline {
            config.baseline.initial_state = state;
        }
        if let Some(state) = self.perturbed {
            config.perturbed.initial_state = state;
        }
        if let Some(span) = self.time_span {
            config.time_span = span;
        }
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(tol) = self.tolerances {
            config.solver.rtol = tol.rtol;
            config.solver.atol = tol.atol;
        }
        if let Some(jidoka) = self.jidoka {
            config.jidoka = jidoka;
        }
        if let Some(parallel) = self.parallel {
            config.output.parallel = parallel;
        }
        if let Some(dir) = self.output_dir {
            config.output.directory = dir;
        }

        config
    }
}

/// Simulation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SimulationMeta {
    /// Simulation name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

fn default_name() -> String {
    "double-pendulum-chaos".to_string()
}

impl Default for SimulationMeta {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
        }
    }
}

/// A named initial condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name, used in logs and report file names.
    #[validate(length(min = 1))]
    pub name: String,
    /// Initial `(θ1, ω1, θ2, ω2)`.
    pub initial_state: PendulumState,
}

impl ScenarioConfig {
    /// Create a scenario entry.
    #[must_use]
    pub fn new(name: impl Into<String>, initial_state: PendulumState) -> Self {
        Self {
            name: name.into(),
            initial_state,
        }
    }

    /// Pair with physical parameters.
    #[must_use]
    pub fn to_scenario(&self, params: &PendulumParams) -> Scenario {
        Scenario::new(self.name.clone(), self.initial_state, *params)
    }
}

/// Adaptive solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Relative tolerance.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// Absolute tolerance.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Step controller safety factor.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_safety")]
    pub safety: f64,
    /// Minimum step reduction factor.
    #[serde(default = "default_min_factor")]
    pub min_factor: f64,
    /// Maximum step growth factor.
    #[serde(default = "default_max_factor")]
    pub max_factor: f64,
    /// Maximum number of step attempts.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    /// Initial step; automatic when absent.
    #[serde(default)]
    pub first_step: Option<f64>,
    /// Step upper bound; unbounded when absent.
    #[serde(default)]
    pub max_step: Option<f64>,
}

const fn default_rtol() -> f64 {
    1e-3
}

const fn default_atol() -> f64 {
    1e-6
}

const fn default_safety() -> f64 {
    0.9
}

const fn default_min_factor() -> f64 {
    0.2
}

const fn default_max_factor() -> f64 {
    10.0
}

const fn default_max_steps() -> u64 {
    1_000_000
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: default_rtol(),
            atol: default_atol(),
            safety: default_safety(),
            min_factor: default_min_factor(),
            max_factor: default_max_factor(),
            max_steps: default_max_steps(),
            first_step: None,
            max_step: None,
        }
    }
}

impl SolverConfig {
    /// Convert to integrator options.
    #[must_use]
    pub const fn to_options(&self) -> SolverOptions {
        SolverOptions {
            tolerances: Tolerances::new(self.rtol, self.atol),
            controller: StepController {
                safety: self.safety,
                min_factor: self.min_factor,
                max_factor: self.max_factor,
            },
            first_step: self.first_step,
            max_step: self.max_step,
            max_steps: self.max_steps,
        }
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// KS significance level (alpha).
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    #[serde(default = "default_significance")]
    pub significance: f64,
    /// Upper bound of the low entropy class (bits).
    #[serde(default = "default_entropy_low")]
    pub entropy_low: f64,
    /// Upper bound of the medium entropy class (bits).
    #[serde(default = "default_entropy_medium")]
    pub entropy_medium: f64,
}

const fn default_significance() -> f64 {
    0.05
}

const fn default_entropy_low() -> f64 {
    0.5
}

const fn default_entropy_medium() -> f64 {
    1.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance: default_significance(),
            entropy_low: default_entropy_low(),
            entropy_medium: default_entropy_medium(),
        }
    }
}

impl AnalysisConfig {
    /// Entropy class boundaries.
    #[must_use]
    pub const fn thresholds(&self) -> EntropyThresholds {
        EntropyThresholds {
            low: self.entropy_low,
            medium: self.entropy_medium,
        }
    }

    /// KS analyzer at the configured significance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for a significance outside `(0, 1)`.
    pub fn divergence_analyzer(&self) -> SimResult<DivergenceAnalyzer> {
        DivergenceAnalyzer::new(self.significance)
    }

    /// Entropy analyzer with the configured thresholds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for unordered thresholds.
    pub fn entropy_analyzer(&self) -> SimResult<EntropyAnalyzer> {
        EntropyAnalyzer::new(self.thresholds())
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving every output file.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Baseline trajectory CSV file name.
    #[validate(length(min = 1))]
    #[serde(default = "default_baseline_file")]
    pub baseline_file: String,
    /// Perturbed trajectory CSV file name.
    #[validate(length(min = 1))]
    #[serde(default = "default_perturbed_file")]
    pub perturbed_file: String,
    /// KS report file name.
    #[validate(length(min = 1))]
    #[serde(default = "default_divergence_file")]
    pub divergence_file: String,
    /// Integrate both scenarios concurrently.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Also write bincode trajectory snapshots.
    #[serde(default)]
    pub write_binary: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_baseline_file() -> String {
    "double_pendulum_original.csv".to_string()
}

fn default_perturbed_file() -> String {
    "double_pendulum_modified.csv".to_string()
}

fn default_divergence_file() -> String {
    "ks_test_results.csv".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            baseline_file: default_baseline_file(),
            perturbed_file: default_perturbed_file(),
            divergence_file: default_divergence_file(),
            parallel: true,
            write_binary: false,
        }
    }
}
