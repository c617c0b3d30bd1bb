//! CLI module for pendular.
//!
//! This module contains all CLI logic extracted from main.rs to enable
//! full test coverage. The entry point `run_cli` can be called from main.rs
//! with parsed arguments.

mod args;
mod commands;
mod output;

pub use args::{Args, Command};
pub use commands::{load_config, run_cli, write_outputs, write_trajectories};
pub use output::{
    print_divergence_table, print_entropy_table, print_help, print_reproducibility,
    print_run_report, print_version,
};

#[cfg(test)]
mod tests;
