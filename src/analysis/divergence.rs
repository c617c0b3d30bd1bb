//! Distributional divergence between two trajectories.
//!
//! Each column is treated as an unordered sample of `N` values and compared
//! with the two-sample Kolmogorov-Smirnov test. Time alignment is ignored:
//! the question answered is whether the perturbed run is statistically
//! distinguishable from the baseline, not when the two runs separate.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::trajectory::{Trajectory, Variable};

/// Default significance level.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Crossover between the two series expansions of the Kolmogorov distribution.
const KOLMOGOROV_SERIES_SWITCH: f64 = 1.18;

/// Two-sample KS statistic and asymptotic p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    /// Maximum absolute gap between the two empirical CDFs.
    pub statistic: f64,
    /// Asymptotic p-value.
    pub p_value: f64,
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Two-sample Kolmogorov-Smirnov statistic `D = sup |F_a(x) - F_b(x)|`.
///
/// Runs of equal values are consumed from both samples before the CDFs are
/// compared, so ties never produce a spurious gap.
///
/// # Errors
///
/// Returns `ShapeMismatch` if either sample is empty.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> SimResult<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(SimError::shape_mismatch(format!(
            "KS test needs two non-empty samples, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let a = sorted(a);
    let b = sorted(b);
    let n = a.len() as f64;
    let m = b.len() as f64;

    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = if a[i].total_cmp(&b[j]).is_le() { a[i] } else { b[j] };
        while i < a.len() && a[i].total_cmp(&x).is_eq() {
            i += 1;
        }
        while j < b.len() && b[j].total_cmp(&x).is_eq() {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    Ok(d)
}

/// Survival function `Q_KS(λ) = P(K > λ)` of the Kolmogorov distribution.
///
/// Small `λ` uses the theta-function form of the CDF, large `λ` the
/// alternating series `2 Σ (-1)^(k-1) exp(-2 k² λ²)`. Both truncate after
/// four terms, well below double precision at the crossover.
#[must_use]
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda.is_nan() || lambda <= 0.0 {
        return 1.0;
    }
    let q = if lambda < KOLMOGOROV_SERIES_SWITCH {
        const SQRT_2PI: f64 = 2.506_628_274_631_000_5;
        let y = (-std::f64::consts::PI.powi(2) / (8.0 * lambda * lambda)).exp();
        let series = y + y.powi(9) + y.powi(25) + y.powi(49);
        1.0 - SQRT_2PI / lambda * series
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        2.0 * (x - x.powi(4) + x.powi(9) - x.powi(16))
    };
    q.clamp(0.0, 1.0)
}

/// Two-sample KS test with the asymptotic p-value
/// `Q_KS(√(n·m / (n + m)) · D)`.
///
/// # Errors
///
/// Returns `ShapeMismatch` if either sample is empty.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> SimResult<KsResult> {
    let statistic = ks_statistic(a, b)?;
    let n = a.len() as f64;
    let m = b.len() as f64;
    let effective = (n * m / (n + m)).sqrt();
    Ok(KsResult {
        statistic,
        p_value: kolmogorov_survival(effective * statistic),
    })
}

/// Outcome of the KS test at the configured significance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceVerdict {
    /// `p < significance`.
    Different,
    /// `p >= significance`.
    Similar,
}

impl DivergenceVerdict {
    /// Interpretation label written to reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Different => "Distributions are different (reject null hypothesis)",
            Self::Similar => "Distributions are similar (fail to reject null hypothesis)",
        }
    }
}

impl fmt::Display for DivergenceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// KS comparison of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    /// Compared column.
    pub variable: Variable,
    /// KS statistic in `[0, 1]`.
    pub statistic: f64,
    /// p-value in `[0, 1]`.
    pub p_value: f64,
    /// Classification against the significance level.
    pub verdict: DivergenceVerdict,
}

impl DivergenceReport {
    /// Interpretation label.
    #[must_use]
    pub const fn interpretation(&self) -> &'static str {
        self.verdict.label()
    }
}

/// Per-variable two-sample KS comparison of two trajectories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceAnalyzer {
    significance: f64,
}

impl Default for DivergenceAnalyzer {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

impl DivergenceAnalyzer {
    /// Create an analyzer with the given significance level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless `0 < significance < 1`.
    pub fn new(significance: f64) -> SimResult<Self> {
        if !(significance > 0.0 && significance < 1.0) {
            return Err(SimError::invalid_parameter(
                "analysis.significance",
                format!("must be in (0, 1), got {significance}"),
            ));
        }
        Ok(Self { significance })
    }

    /// Significance level.
    #[must_use]
    pub const fn significance(&self) -> f64 {
        self.significance
    }

    /// Classify a p-value.
    #[must_use]
    pub fn verdict(&self, p_value: f64) -> DivergenceVerdict {
        if p_value < self.significance {
            DivergenceVerdict::Different
        } else {
            DivergenceVerdict::Similar
        }
    }

    /// Compare one column from each trajectory.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for empty or unequal-length columns.
    pub fn compare_columns(
        &self,
        variable: Variable,
        a: &[f64],
        b: &[f64],
    ) -> SimResult<DivergenceReport> {
        if a.len() != b.len() {
            return Err(SimError::shape_mismatch(format!(
                "column '{variable}' has {} vs {} samples",
                a.len(),
                b.len()
            )));
        }
        let KsResult { statistic, p_value } = ks_2samp(a, b)?;
        Ok(DivergenceReport {
            variable,
            statistic,
            p_value,
            verdict: self.verdict(p_value),
        })
    }

    /// Compare every variable, in column order.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if either trajectory is empty or the sample
    /// counts differ. No partial report is produced.
    pub fn compare(&self, baseline: &Trajectory, perturbed: &Trajectory) -> SimResult<Vec<DivergenceReport>> {
        if baseline.is_empty() || perturbed.is_empty() {
            return Err(SimError::shape_mismatch(format!(
                "divergence needs two non-empty trajectories, got {} and {} samples",
                baseline.len(),
                perturbed.len()
            )));
        }
        if baseline.len() != perturbed.len() {
            return Err(SimError::shape_mismatch(format!(
                "trajectories have {} vs {} samples",
                baseline.len(),
                perturbed.len()
            )));
        }

        let reports = Variable::ALL
            .into_iter()
            .map(|var| self.compare_columns(var, &baseline.column(var), &perturbed.column(var)))
            .collect::<SimResult<Vec<_>>>()?;

        debug!(
            different = reports
                .iter()
                .filter(|r| r.verdict == DivergenceVerdict::Different)
                .count(),
            variables = reports.len(),
            "divergence analysis finished"
        );
        Ok(reports)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::trajectory::TrajectorySample;

    fn linear_trajectory(n: usize, offset: f64) -> Trajectory {
        Trajectory::from_samples(
            (0..n)
                .map(|i| {
                    let v = i as f64 + offset;
                    TrajectorySample::from_row([i as f64, v, v, v, v, v, v, v, v])
                })
                .collect(),
        )
    }

    #[test]
    fn test_statistic_identical_is_zero() {
        let a = [3.0, 1.0, 2.0, 2.0];
        assert!(ks_statistic(&a, &a).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistic_disjoint_is_one() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 11.0, 12.0];
        assert!((ks_statistic(&a, &b).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistic_interleaved() {
        // F_a jumps at 1,3 ; F_b at 2,4 -> max gap 1/2
        let a = [1.0, 3.0];
        let b = [2.0, 4.0];
        assert!((ks_statistic(&a, &b).unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistic_ties_across_samples() {
        // Shared value 1.0 must be consumed from both sides at once.
        let a = [1.0, 1.0, 2.0];
        let b = [1.0, 2.0, 2.0];
        let d = ks_statistic(&a, &b).unwrap();
        assert!((d - 1.0 / 3.0).abs() < 1e-12, "d={d}");
    }

    #[test]
    fn test_statistic_unequal_lengths() {
        let a = [0.0, 1.0];
        let b = [0.5];
        assert!((ks_statistic(&a, &b).unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistic_empty_rejected() {
        let err = ks_statistic(&[], &[1.0]).unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_kolmogorov_survival_known_values() {
        assert!((kolmogorov_survival(0.0) - 1.0).abs() < f64::EPSILON);
        assert!((kolmogorov_survival(1.0) - 0.269_999_67).abs() < 1e-4);
        assert!((kolmogorov_survival(1.358_1) - 0.05).abs() < 1e-3);
        assert!((kolmogorov_survival(0.5) - 0.963_945).abs() < 1e-4);
        assert!(kolmogorov_survival(5.0) < 1e-20);
    }

    #[test]
    fn test_kolmogorov_survival_continuous_at_switch() {
        let below = kolmogorov_survival(KOLMOGOROV_SERIES_SWITCH - 1e-9);
        let above = kolmogorov_survival(KOLMOGOROV_SERIES_SWITCH + 1e-9);
        assert!((below - above).abs() < 1e-6, "{below} vs {above}");
    }

    #[test]
    fn test_kolmogorov_survival_monotone() {
        let mut prev = 1.0;
        for i in 1..400 {
            let q = kolmogorov_survival(f64::from(i) * 0.01);
            assert!(q <= prev + 1e-12);
            prev = q;
        }
    }

    #[test]
    fn test_ks_2samp_self_comparison() {
        let a: Vec<f64> = (0..500).map(|i| (f64::from(i) * 0.37).sin()).collect();
        let result = ks_2samp(&a, &a).unwrap();
        assert!(result.statistic.abs() < f64::EPSILON);
        assert!((result.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ks_2samp_shifted_is_significant() {
        let a: Vec<f64> = (0..1000).map(f64::from).collect();
        let b: Vec<f64> = (0..1000).map(|i| f64::from(i) + 300.0).collect();
        let result = ks_2samp(&a, &b).unwrap();
        assert!((result.statistic - 0.3).abs() < 1e-12);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn test_analyzer_labels() {
        let analyzer = DivergenceAnalyzer::default();
        assert_eq!(analyzer.verdict(0.01), DivergenceVerdict::Different);
        assert_eq!(analyzer.verdict(0.05), DivergenceVerdict::Similar);
        assert_eq!(
            DivergenceVerdict::Different.label(),
            "Distributions are different (reject null hypothesis)"
        );
        assert_eq!(
            DivergenceVerdict::Similar.to_string(),
            "Distributions are similar (fail to reject null hypothesis)"
        );
    }

    #[test]
    fn test_analyzer_rejects_bad_significance() {
        assert!(DivergenceAnalyzer::new(0.0).is_err());
        assert!(DivergenceAnalyzer::new(1.0).is_err());
        assert!(DivergenceAnalyzer::new(f64::NAN).is_err());
        assert!((DivergenceAnalyzer::new(0.01).unwrap().significance() - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare_self_is_similar_everywhere() {
        let traj = linear_trajectory(200, 0.0);
        let reports = DivergenceAnalyzer::default().compare(&traj, &traj).unwrap();
        assert_eq!(reports.len(), Variable::ALL.len());
        for (report, var) in reports.iter().zip(Variable::ALL) {
            assert_eq!(report.variable, var);
            assert!(report.statistic.abs() < f64::EPSILON);
            assert!((report.p_value - 1.0).abs() < f64::EPSILON);
            assert_eq!(report.verdict, DivergenceVerdict::Similar);
        }
    }

    #[test]
    fn test_compare_detects_shift_but_not_time() {
        let a = linear_trajectory(1000, 0.0);
        let b = linear_trajectory(1000, 500.0);
        let reports = DivergenceAnalyzer::default().compare(&a, &b).unwrap();
        assert_eq!(reports[0].variable, Variable::T);
        assert_eq!(reports[0].verdict, DivergenceVerdict::Similar);
        assert!(reports[1..].iter().all(|r| r.verdict == DivergenceVerdict::Different));
    }

    #[test]
    fn test_compare_shape_mismatch() {
        let analyzer = DivergenceAnalyzer::default();
        let err = analyzer
            .compare(&linear_trajectory(10, 0.0), &linear_trajectory(11, 0.0))
            .unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));

        let err = analyzer
            .compare(&Trajectory::default(), &Trajectory::default())
            .unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_compare_columns_length_mismatch() {
        let err = DivergenceAnalyzer::default()
            .compare_columns(Variable::X1, &[1.0, 2.0], &[1.0])
            .unwrap_err();
        assert!(err.to_string().contains("x1"));
    }
}
