//! Chaos analysis of sampled trajectories.
//!
//! - [`divergence`]: two-sample Kolmogorov-Smirnov comparison of a baseline
//!   and a perturbed run, per variable
//! - [`entropy`]: exact-value Shannon entropy of one run, per variable
//!
//! Both analyzers walk [`Variable::ALL`](crate::trajectory::Variable::ALL)
//! and produce one report per column, in column order.

pub mod divergence;
pub mod entropy;

pub use divergence::{
    ks_2samp, ks_statistic, kolmogorov_survival, DivergenceAnalyzer, DivergenceReport,
    DivergenceVerdict, KsResult,
};
pub use entropy::{
    shannon_entropy, EntropyAnalyzer, EntropyClass, EntropyReport, EntropyThresholds,
};
