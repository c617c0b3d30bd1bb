//! Pre-built simulation scenarios.
//!
//! - Double pendulum (the canonical chaotic system)

pub mod pendulum;

pub use pendulum::{
    equations_of_motion, DoublePendulumSystem, PendulumParams, Scenario, ScenarioRun, TimeSpan,
};
