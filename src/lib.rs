//! # pendular
//!
//! Chaotic double pendulum simulation and divergence analysis.
//!
//! Two nearly identical initial conditions are integrated with an adaptive
//! Dormand-Prince solver, sampled onto a uniform grid and compared:
//! - Kinematics: angles, angular velocities and Cartesian bob positions
//! - Divergence: two-sample Kolmogorov-Smirnov test per variable
//! - Predictability: exact-value Shannon entropy per variable
//! - Jidoka: the run stops on the first non-finite or inconsistent state
//!
//! ## Example
//!
//! ```rust
//! use pendular::prelude::*;
//!
//! let config = SimConfig::builder()
//!     .duration(1.0)
//!     .samples(100)
//!     .build();
//! let engine = SimEngine::new(config).unwrap();
//! let outcome = engine.run().unwrap();
//!
//! assert_eq!(outcome.baseline.trajectory.len(), 100);
//! assert_eq!(outcome.report.analysis.divergence.len(), 9);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suspicious_operation_groupings,
    clippy::suboptimal_flops,  // Written-out Butcher tableau and 2x2 solve
    clippy::imprecise_flops,
    clippy::no_effect_underscore_binding,
    clippy::too_many_lines,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::needless_range_loop,   // Stage loops index several arrays at once
    clippy::manual_midpoint,
)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod scenarios;
pub mod trajectory;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        DivergenceAnalyzer, DivergenceReport, DivergenceVerdict, EntropyAnalyzer, EntropyClass,
        EntropyReport,
    };
    pub use crate::config::{SimConfig, SimConfigBuilder};
    pub use crate::domains::physics::{Rk45Integrator, SolverOptions, Tolerances};
    pub use crate::engine::jidoka::{JidokaConfig, JidokaGuard};
    pub use crate::engine::{PendulumState, RunOutcome, SimEngine};
    pub use crate::error::{SimError, SimResult};
    pub use crate::scenarios::pendulum::{PendulumParams, Scenario, TimeSpan};
    pub use crate::trajectory::{Trajectory, Variable};
}

/// Re-export for public API
pub use error::{SimError, SimResult};
