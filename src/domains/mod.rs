//! Domain-specific simulation engines.
//!
//! - Physics: adaptive ODE integration with dense output

pub mod physics;

pub use physics::{
    hermite_interpolate, uniform_grid, DenseSolution, IntegrationStats, OdeSystem,
    Rk45Integrator, SolverOptions, StepController, Tolerances,
};
