//! CLI command handlers.
//!
//! This module contains the execution logic for each CLI command.
//! Handlers return an `ExitCode`; the fallible work lives in small
//! `SimResult` helpers so it can be tested directly.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::info;

use crate::analysis::{DivergenceAnalyzer, DivergenceReport, EntropyAnalyzer, EntropyReport};
use crate::config::{OutputConfig, SimConfig};
use crate::engine::{RunOutcome, SimEngine};
use crate::error::SimResult;
use crate::scenarios::pendulum::ScenarioRun;
use crate::trajectory::export;

use super::output::{
    print_divergence_table, print_entropy_table, print_help, print_reproducibility,
    print_run_report, print_version, print_written_files,
};
use super::{Args, Command};

/// Main CLI entry point.
///
/// Dispatches to the appropriate command handler based on parsed arguments.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    let verbose = args.verbose;
    match args.command {
        Command::Run {
            config_path,
            out_dir,
            sequential,
            json,
        } => run_experiment(&config_path, out_dir, sequential, json, verbose),
        Command::Verify { config_path, runs } => verify_reproducibility(&config_path, runs),
        Command::Simulate {
            config_path,
            out_dir,
        } => simulate(&config_path, out_dir),
        Command::Analyze {
            baseline_path,
            perturbed_path,
            out_dir,
        } => analyze(&baseline_path, &perturbed_path, out_dir, verbose),
        Command::Config => print_default_config(),
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
    }
}

fn report_error(e: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("Error: {e}");
    ExitCode::from(1)
}

/// Load a configuration and apply command-line overrides.
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path, out_dir: Option<PathBuf>, sequential: bool) -> SimResult<SimConfig> {
    let mut config = SimConfig::load(path)?;
    if let Some(dir) = out_dir {
        config.output.directory = dir;
    }
    if sequential {
        config.output.parallel = false;
    }
    Ok(config)
}

/// Write both trajectory tables (and snapshots if configured).
///
/// # Errors
///
/// Returns `Io` or `Serialization` if any file cannot be written.
pub fn write_trajectories(
    output: &OutputConfig,
    baseline: &ScenarioRun,
    perturbed: &ScenarioRun,
) -> SimResult<Vec<PathBuf>> {
    export::ensure_dir(&output.directory)?;
    let mut written = Vec::new();

    for (run, file) in [
        (baseline, &output.baseline_file),
        (perturbed, &output.perturbed_file),
    ] {
        let path = output.directory.join(file);
        export::save_trajectory_csv(&run.trajectory, &path)?;
        written.push(path);

        if output.write_binary {
            let path = output.directory.join(format!("{}.bin", run.name));
            export::save_binary(&run.trajectory, &path)?;
            written.push(path);
        }
    }
    Ok(written)
}

/// Write trajectories plus KS and entropy reports for a full run.
///
/// # Errors
///
/// Returns `Io` or `Serialization` if any file cannot be written.
pub fn write_outputs(output: &OutputConfig, outcome: &RunOutcome) -> SimResult<Vec<PathBuf>> {
    let mut written = write_trajectories(output, &outcome.baseline, &outcome.perturbed)?;
    let analysis = &outcome.report.analysis;

    let path = output.directory.join(&output.divergence_file);
    export::save_divergence_csv(&analysis.divergence, &path)?;
    written.push(path);

    for (name, reports) in [
        (&outcome.baseline.name, &analysis.baseline_entropy),
        (&outcome.perturbed.name, &analysis.perturbed_entropy),
    ] {
        let path = output.directory.join(export::entropy_file_name(name));
        export::save_entropy_csv(reports, &path)?;
        written.push(path);
    }

    info!(files = written.len(), directory = %output.directory.display(), "outputs written");
    Ok(written)
}

/// Run the full experiment from a YAML file.
#[must_use]
pub fn run_experiment(
    path: &Path,
    out_dir: Option<PathBuf>,
    sequential: bool,
    json: bool,
    verbose: bool,
) -> ExitCode {
    let result = load_config(path, out_dir, sequential)
        .and_then(SimEngine::new)
        .and_then(|engine| {
            let outcome = engine.run()?;
            let written = write_outputs(&engine.config().output, &outcome)?;
            Ok((outcome, written))
        });

    match result {
        Ok((outcome, written)) => {
            if json {
                match outcome.report.to_json() {
                    Ok(text) => println!("{text}"),
                    Err(e) => return report_error(&e),
                }
            } else {
                print_run_report(&outcome.report, verbose);
                print_written_files(&written);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Verify that the baseline scenario reproduces bit for bit.
#[must_use]
pub fn verify_reproducibility(path: &Path, runs: usize) -> ExitCode {
    let result = load_config(path, None, false)
        .and_then(SimEngine::new)
        .and_then(|engine| engine.verify_reproducibility(runs));

    match result {
        Ok(report) => {
            print_reproducibility(&report);
            if report.is_reproducible() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => report_error(&e),
    }
}

/// Integrate both scenarios and write their trajectory tables.
#[must_use]
pub fn simulate(path: &Path, out_dir: Option<PathBuf>) -> ExitCode {
    let result = load_config(path, out_dir, false)
        .and_then(SimEngine::new)
        .and_then(|engine| {
            let (baseline, perturbed) = engine.run_pair()?;
            write_trajectories(&engine.config().output, &baseline, &perturbed)
        });

    match result {
        Ok(written) => {
            print_written_files(&written);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// KS and entropy reports of two trajectory files, plus the report files written.
type FileAnalysis = (
    Vec<DivergenceReport>,
    Vec<EntropyReport>,
    Vec<EntropyReport>,
    Vec<PathBuf>,
);

fn analyze_files(baseline_path: &Path, perturbed_path: &Path, directory: &Path) -> SimResult<FileAnalysis> {
    let output = OutputConfig::default();
    let baseline = export::load_trajectory_csv(baseline_path)?;
    let perturbed = export::load_trajectory_csv(perturbed_path)?;
    let divergence = DivergenceAnalyzer::default().compare(&baseline, &perturbed)?;
    let entropy = EntropyAnalyzer::default();
    let baseline_entropy = entropy.analyze(&baseline)?;
    let perturbed_entropy = entropy.analyze(&perturbed)?;

    export::ensure_dir(directory)?;
    let path = directory.join(&output.divergence_file);
    export::save_divergence_csv(&divergence, &path)?;
    let mut written = vec![path];
    for (name, reports) in [("original", &baseline_entropy), ("perturbed", &perturbed_entropy)] {
        let path = directory.join(export::entropy_file_name(name));
        export::save_entropy_csv(reports, &path)?;
        written.push(path);
    }
    Ok((divergence, baseline_entropy, perturbed_entropy, written))
}

/// Analyze two trajectory CSV files with the default analyzers.
#[must_use]
pub fn analyze(
    baseline_path: &Path,
    perturbed_path: &Path,
    out_dir: Option<PathBuf>,
    verbose: bool,
) -> ExitCode {
    let directory = out_dir.unwrap_or_else(|| OutputConfig::default().directory);

    match analyze_files(baseline_path, perturbed_path, &directory) {
        Ok((divergence, baseline_entropy, perturbed_entropy, written)) => {
            print_divergence_table(&divergence);
            println!();
            print_entropy_table("original", &baseline_entropy);
            if verbose {
                println!();
                print_entropy_table("perturbed", &perturbed_entropy);
            }
            println!();
            print_written_files(&written);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Print the default configuration as YAML.
#[must_use]
pub fn print_default_config() -> ExitCode {
    match SimConfig::default().to_yaml() {
        Ok(yaml) => {
            print!("{yaml}");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}
