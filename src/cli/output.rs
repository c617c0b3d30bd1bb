//! CLI output formatting.
//!
//! This module contains all output formatting functions for the CLI.
//! Extracted to enable testing of output generation.

use std::path::PathBuf;

use crate::analysis::{DivergenceReport, DivergenceVerdict, EntropyReport};
use crate::engine::{ReproducibilityReport, RunReport, ScenarioSummary};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Print version information.
pub fn print_version() {
    println!(
        "pendular {} ({})",
        env!("PENDULAR_VERSION"),
        env!("PENDULAR_GIT_HASH")
    );
}

/// Print help message.
pub fn print_help() {
    println!(
        r"pendular - Chaotic double pendulum simulation and divergence analysis

USAGE:
    pendular <COMMAND> [OPTIONS]

COMMANDS:
    run <config.yaml>           Integrate both scenarios, analyze, write outputs
        --out <DIR>             Override the output directory
        --sequential            Integrate the scenarios one after the other
        --json                  Print the run report as JSON

    verify <config.yaml>        Verify reproducibility across multiple runs
        --runs <N>              Number of verification runs (default: 3)

    simulate <config.yaml>      Integrate both scenarios, write trajectories only
        --out <DIR>             Override the output directory

    analyze <a.csv> <b.csv>     KS divergence and entropy of two trajectory files
        --out <DIR>             Directory for the report files (default: data)

    config                      Print the default configuration (YAML)
    help                        Show this help message
    version                     Show version information

GLOBAL OPTIONS:
    -v, --verbose               Log progress (RUST_LOG overrides)

EXAMPLES:
    pendular config > pendulum.yaml
    pendular run pendulum.yaml --out data
    pendular verify pendulum.yaml --runs 5
    pendular analyze data/double_pendulum_original.csv data/double_pendulum_modified.csv
"
    );
}

/// Print the KS table.
pub fn print_divergence_table(reports: &[DivergenceReport]) {
    println!("Kolmogorov-Smirnov Divergence:");
    println!("  {:<8} {:>12} {:>12}  Interpretation", "Variable", "KS", "p-value");
    for r in reports {
        let sym = match r.verdict {
            DivergenceVerdict::Different => "✗",
            DivergenceVerdict::Similar => "✓",
        };
        println!(
            "  {:<8} {:>12.6} {:>12.4e}  {sym} {}",
            r.variable.name(),
            r.statistic,
            r.p_value,
            r.interpretation()
        );
    }
}

/// Print one scenario's entropy table.
pub fn print_entropy_table(scenario: &str, reports: &[EntropyReport]) {
    println!("Shannon Entropy ({scenario}):");
    println!("  {:<8} {:>8}  Interpretation", "Variable", "Entropy");
    for r in reports {
        println!(
            "  {:<8} {:>8}  {}",
            r.variable.name(),
            r.formatted(),
            r.interpretation()
        );
    }
}

fn print_scenario_summary(summary: &ScenarioSummary, verbose: bool) {
    println!("Scenario: {}", summary.name);
    println!("  Samples:      {}", summary.samples);
    println!("  Energy drift: {:.3e}", summary.energy_drift);
    if verbose {
        println!(
            "  Steps:        {} accepted, {} rejected, {} evaluations",
            summary.stats.accepted_steps, summary.stats.rejected_steps, summary.stats.fn_evals
        );
        println!("  Fingerprint:  {}", summary.fingerprint);
    }
}

/// Print a run report.
///
/// # Arguments
///
/// * `report` - The run report to display
/// * `verbose` - Whether to show solver statistics, fingerprints and both
///   entropy tables
pub fn print_run_report(report: &RunReport, verbose: bool) {
    println!("{RULE}");
    println!("Simulation: {}", report.simulation);
    println!("{RULE}\n");

    print_scenario_summary(&report.baseline, verbose);
    print_scenario_summary(&report.perturbed, verbose);
    println!();

    print_divergence_table(&report.analysis.divergence);
    println!();
    print_entropy_table(&report.baseline.name, &report.analysis.baseline_entropy);
    if verbose {
        println!();
        print_entropy_table(&report.perturbed.name, &report.analysis.perturbed_entropy);
    }

    let different = report
        .analysis
        .divergence
        .iter()
        .filter(|r| r.verdict == DivergenceVerdict::Different)
        .count();
    println!("\n{RULE}");
    println!(
        "{different}/{} variables diverge between '{}' and '{}'",
        report.analysis.divergence.len(),
        report.baseline.name,
        report.perturbed.name
    );
    println!("{RULE}\n");
}

/// Print reproducibility verification results.
pub fn print_reproducibility(report: &ReproducibilityReport) {
    println!("{RULE}");
    println!("Reproducibility: {}", report.scenario);
    println!("{RULE}\n");
    for (i, hash) in report.fingerprints.iter().enumerate() {
        println!("  Run {}: {hash}", i + 1);
    }
    let (status, sym) = if report.is_reproducible() {
        ("IDENTICAL", "✓")
    } else {
        ("MISMATCH", "✗")
    };
    println!("\n{RULE}");
    println!("{sym} Result: {status} ({} runs)", report.fingerprints.len());
    println!("{RULE}\n");
}

/// Print the list of files written.
pub fn print_written_files(paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    println!("Wrote:");
    for path in paths {
        println!("  {}", path.display());
    }
}
