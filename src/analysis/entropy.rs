//! Shannon entropy of trajectory columns.
//!
//! Entropy is taken over the frequencies of exactly equal values, with no
//! binning. Samples of a continuous trajectory are almost always pairwise
//! distinct, so most columns (including the evenly spaced time column) land
//! near `log2 N` bits and classify as high entropy.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::trajectory::{Trajectory, Variable};

/// Shannon entropy `H = -Σ p(v) log2 p(v)` over the distinct values of
/// `values`, in bits.
///
/// Values are grouped by floating-point equality after a total-order sort:
/// `-0.0` and `0.0` count as one value, every NaN as its own.
///
/// # Errors
///
/// Returns `ShapeMismatch` for an empty series.
pub fn shannon_entropy(values: &[f64]) -> SimResult<f64> {
    if values.is_empty() {
        return Err(SimError::shape_mismatch(
            "entropy needs a non-empty series",
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mut h = 0.0;
    let mut run = 1usize;
    for i in 1..=sorted.len() {
        if i < sorted.len() && sorted[i] == sorted[i - 1] {
            run += 1;
            continue;
        }
        let p = run as f64 / n;
        h -= p * p.log2();
        run = 1;
    }
    Ok(h.max(0.0))
}

/// Round to three decimal digits.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Qualitative entropy class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyClass {
    /// `H <= low`.
    Low,
    /// `low < H <= medium`.
    Medium,
    /// `H > medium`.
    High,
}

impl EntropyClass {
    /// Interpretation label written to reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low entropy: Predictable",
            Self::Medium => "Medium entropy: Some predictability",
            Self::High => "High entropy: Unpredictable",
        }
    }
}

impl fmt::Display for EntropyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Class boundaries in bits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyThresholds {
    /// Upper bound (inclusive) of the low class.
    pub low: f64,
    /// Upper bound (inclusive) of the medium class.
    pub medium: f64,
}

impl Default for EntropyThresholds {
    fn default() -> Self {
        Self {
            low: 0.5,
            medium: 1.0,
        }
    }
}

impl EntropyThresholds {
    /// Classify an entropy value.
    #[must_use]
    pub fn classify(&self, entropy: f64) -> EntropyClass {
        if entropy <= self.low {
            EntropyClass::Low
        } else if entropy <= self.medium {
            EntropyClass::Medium
        } else {
            EntropyClass::High
        }
    }

    /// Check ordering `0 <= low <= medium`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when the bounds are non-finite or unordered.
    pub fn ensure_valid(&self) -> SimResult<()> {
        if !(self.low.is_finite() && self.medium.is_finite() && 0.0 <= self.low && self.low <= self.medium) {
            return Err(SimError::invalid_parameter(
                "analysis.entropy_thresholds",
                format!(
                    "expected 0 <= low <= medium, got low={} medium={}",
                    self.low, self.medium
                ),
            ));
        }
        Ok(())
    }
}

/// Entropy of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyReport {
    /// Analyzed column.
    pub variable: Variable,
    /// Entropy in bits, rounded to three decimals.
    pub entropy: f64,
    /// Classification of the unrounded entropy.
    pub class: EntropyClass,
}

impl EntropyReport {
    /// Entropy formatted with three decimals, e.g. `13.288`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format!("{:.3}", self.entropy)
    }

    /// Interpretation label.
    #[must_use]
    pub const fn interpretation(&self) -> &'static str {
        self.class.label()
    }
}

/// Per-variable entropy analysis of one trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntropyAnalyzer {
    thresholds: EntropyThresholds,
}

impl EntropyAnalyzer {
    /// Create an analyzer with custom class boundaries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for unordered thresholds.
    pub fn new(thresholds: EntropyThresholds) -> SimResult<Self> {
        thresholds.ensure_valid()?;
        Ok(Self { thresholds })
    }

    /// Class boundaries.
    #[must_use]
    pub const fn thresholds(&self) -> &EntropyThresholds {
        &self.thresholds
    }

    /// Analyze a single column.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for an empty column.
    pub fn analyze_column(&self, variable: Variable, values: &[f64]) -> SimResult<EntropyReport> {
        let h = shannon_entropy(values)?;
        Ok(EntropyReport {
            variable,
            entropy: round3(h),
            class: self.thresholds.classify(h),
        })
    }

    /// Analyze every variable, in column order.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` for an empty trajectory.
    pub fn analyze(&self, trajectory: &Trajectory) -> SimResult<Vec<EntropyReport>> {
        if trajectory.is_empty() {
            return Err(SimError::shape_mismatch(
                "entropy needs a non-empty trajectory",
            ));
        }
        let reports = Variable::ALL
            .into_iter()
            .map(|var| self.analyze_column(var, &trajectory.column(var)))
            .collect::<SimResult<Vec<_>>>()?;
        debug!(variables = reports.len(), samples = trajectory.len(), "entropy analysis finished");
        Ok(reports)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::trajectory::TrajectorySample;

    #[test]
    fn test_constant_column_is_zero() {
        let h = shannon_entropy(&[4.2; 100]).unwrap();
        assert!(h.abs() < f64::EPSILON);
        let report = EntropyAnalyzer::default()
            .analyze_column(Variable::X1, &[4.2; 100])
            .unwrap();
        assert_eq!(report.formatted(), "0.000");
        assert_eq!(report.class, EntropyClass::Low);
        assert_eq!(report.interpretation(), "Low entropy: Predictable");
    }

    #[test]
    fn test_two_equal_halves_is_one_bit() {
        let values = [1.0, 2.0, 1.0, 2.0];
        let h = shannon_entropy(&values).unwrap();
        assert!((h - 1.0).abs() < 1e-12);
        // Exactly on the medium boundary.
        assert_eq!(EntropyThresholds::default().classify(h), EntropyClass::Medium);
    }

    #[test]
    fn test_all_distinct_is_log2_n() {
        let values: Vec<f64> = (0..1024).map(f64::from).collect();
        let h = shannon_entropy(&values).unwrap();
        assert!((h - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_skewed_distribution() {
        // p = 3/4, 1/4
        let h = shannon_entropy(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        let expected = -(0.75f64 * 0.75f64.log2() + 0.25 * 0.25f64.log2());
        assert!((h - expected).abs() < 1e-12);
        assert_eq!(EntropyThresholds::default().classify(h), EntropyClass::Medium);
    }

    #[test]
    fn test_signed_zero_groups_and_nan_splits() {
        let h = shannon_entropy(&[0.0, -0.0]).unwrap();
        assert!(h.abs() < f64::EPSILON);
        let h = shannon_entropy(&[f64::NAN, f64::NAN]).unwrap();
        assert!((h - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rejected() {
        let err = shannon_entropy(&[]).unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
        let err = EntropyAnalyzer::default()
            .analyze(&Trajectory::default())
            .unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_classification_boundaries() {
        let t = EntropyThresholds::default();
        assert_eq!(t.classify(0.0), EntropyClass::Low);
        assert_eq!(t.classify(0.5), EntropyClass::Low);
        assert_eq!(t.classify(0.500_1), EntropyClass::Medium);
        assert_eq!(t.classify(1.0), EntropyClass::Medium);
        assert_eq!(t.classify(1.000_1), EntropyClass::High);
        assert_eq!(EntropyClass::High.to_string(), "High entropy: Unpredictable");
        assert_eq!(EntropyClass::Medium.label(), "Medium entropy: Some predictability");
    }

    #[test]
    fn test_classification_uses_unrounded_value() {
        // 0.5004 rounds to 0.500 but is still above the low bound.
        let analyzer = EntropyAnalyzer::new(EntropyThresholds {
            low: 0.5,
            medium: 1.0,
        })
        .unwrap();
        let report = EntropyReport {
            variable: Variable::T,
            entropy: round3(0.500_4),
            class: analyzer.thresholds().classify(0.500_4),
        };
        assert_eq!(report.formatted(), "0.500");
        assert_eq!(report.class, EntropyClass::Medium);
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(EntropyThresholds::default().ensure_valid().is_ok());
        let bad = EntropyThresholds {
            low: 2.0,
            medium: 1.0,
        };
        assert!(bad.ensure_valid().is_err());
        assert!(EntropyAnalyzer::new(bad).is_err());
    }

    #[test]
    fn test_time_column_reports_high_entropy() {
        let traj = Trajectory::from_samples(
            (0..10_000)
                .map(|i| {
                    let t = f64::from(i) * 10.0 / 9_999.0;
                    TrajectorySample::from_row([t, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0])
                })
                .collect(),
        );
        let reports = EntropyAnalyzer::default().analyze(&traj).unwrap();
        assert_eq!(reports.len(), 9);
        assert_eq!(reports[0].variable, Variable::T);
        assert_eq!(reports[0].formatted(), "13.288");
        assert_eq!(reports[0].class, EntropyClass::High);
        for report in &reports[1..] {
            assert_eq!(report.formatted(), "0.000");
            assert_eq!(report.class, EntropyClass::Low);
        }
    }
}
