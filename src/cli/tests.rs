//! CLI module tests.
//!
//! Parsing, output formatting and end-to-end command handlers on short
//! configurations written to temporary directories.

use super::args::{Args, Command};
use super::commands::{
    analyze, load_config, print_default_config, run_cli, run_experiment, simulate,
    verify_reproducibility, write_outputs,
};
use super::output::{
    print_divergence_table, print_entropy_table, print_help, print_reproducibility,
    print_run_report, print_version, print_written_files,
};
use crate::config::SimConfig;
use crate::engine::{ReproducibilityReport, SimEngine};
use crate::trajectory::export;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SHORT_CONFIG: &str = r"
time_span:
  end: 1.0
samples: 100
";

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("pendulum.yaml");
    let out = dir.join("out");
    let yaml = format!(
        "{SHORT_CONFIG}output:\n  directory: {}\n{extra}",
        out.display()
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

// ============================================================================
// Args parsing tests
// ============================================================================

#[test]
fn test_parse_no_args_shows_help() {
    let args = Args::parse_from(["pendular"]);
    assert_eq!(args.command, Command::Help);
    assert!(!args.verbose);
}

#[test]
fn test_parse_help_flags() {
    for flag in ["-h", "--help", "help"] {
        let args = Args::parse_from(["pendular", flag]);
        assert_eq!(args.command, Command::Help);
    }
}

#[test]
fn test_parse_version_flags() {
    for flag in ["-V", "--version", "version"] {
        let args = Args::parse_from(["pendular", flag]);
        assert_eq!(args.command, Command::Version);
    }
}

#[test]
fn test_parse_unknown_command() {
    let args = Args::parse_from(["pendular", "unknown-cmd"]);
    assert_eq!(args.command, Command::Help);
}

#[test]
fn test_parse_config_command() {
    let args = Args::parse_from(["pendular", "config"]);
    assert_eq!(args.command, Command::Config);
}

#[test]
fn test_parse_run_command() {
    let args = Args::parse_from(["pendular", "run", "pendulum.yaml"]);
    match args.command {
        Command::Run {
            config_path,
            out_dir,
            sequential,
            json,
        } => {
            assert_eq!(config_path, PathBuf::from("pendulum.yaml"));
            assert_eq!(out_dir, None);
            assert!(!sequential);
            assert!(!json);
        }
        _ => panic!("Expected Run command"),
    }
    assert!(!args.verbose);
}

#[test]
fn test_parse_run_command_with_all_options() {
    let args = Args::parse_from([
        "pendular",
        "run",
        "pendulum.yaml",
        "--out",
        "results",
        "--sequential",
        "--json",
        "-v",
    ]);
    assert_eq!(
        args.command,
        Command::Run {
            config_path: PathBuf::from("pendulum.yaml"),
            out_dir: Some(PathBuf::from("results")),
            sequential: true,
            json: true,
        }
    );
    assert!(args.verbose);
}

#[test]
fn test_parse_run_command_missing_path() {
    assert_eq!(Args::parse_from(["pendular", "run"]).command, Command::Help);
    assert_eq!(
        Args::parse_from(["pendular", "run", "--json"]).command,
        Command::Help
    );
}

#[test]
fn test_parse_run_out_without_value() {
    let args = Args::parse_from(["pendular", "run", "pendulum.yaml", "--out", "--json"]);
    match args.command {
        Command::Run { out_dir, json, .. } => {
            assert_eq!(out_dir, None);
            assert!(json);
        }
        _ => panic!("Expected Run command"),
    }
}

#[test]
fn test_parse_verify_command() {
    let args = Args::parse_from(["pendular", "verify", "pendulum.yaml"]);
    assert_eq!(
        args.command,
        Command::Verify {
            config_path: PathBuf::from("pendulum.yaml"),
            runs: 3,
        }
    );
}

#[test]
fn test_parse_verify_command_with_runs() {
    let args = Args::parse_from(["pendular", "verify", "pendulum.yaml", "--runs", "7"]);
    assert_eq!(
        args.command,
        Command::Verify {
            config_path: PathBuf::from("pendulum.yaml"),
            runs: 7,
        }
    );
}

#[test]
fn test_parse_verify_command_invalid_runs_uses_default() {
    for value in ["abc", "0"] {
        let args = Args::parse_from(["pendular", "verify", "pendulum.yaml", "--runs", value]);
        match args.command {
            Command::Verify { runs, .. } => assert_eq!(runs, 3),
            _ => panic!("Expected Verify command"),
        }
    }
}

#[test]
fn test_parse_simulate_command() {
    let args = Args::parse_from(["pendular", "simulate", "pendulum.yaml", "--out", "traj"]);
    assert_eq!(
        args.command,
        Command::Simulate {
            config_path: PathBuf::from("pendulum.yaml"),
            out_dir: Some(PathBuf::from("traj")),
        }
    );
    assert_eq!(Args::parse_from(["pendular", "simulate"]).command, Command::Help);
}

#[test]
fn test_parse_analyze_command() {
    let args = Args::parse_from(["pendular", "analyze", "a.csv", "b.csv"]);
    assert_eq!(
        args.command,
        Command::Analyze {
            baseline_path: PathBuf::from("a.csv"),
            perturbed_path: PathBuf::from("b.csv"),
            out_dir: None,
        }
    );
}

#[test]
fn test_parse_analyze_command_missing_second_path() {
    assert_eq!(
        Args::parse_from(["pendular", "analyze", "a.csv"]).command,
        Command::Help
    );
    assert_eq!(
        Args::parse_from(["pendular", "analyze", "a.csv", "--out"]).command,
        Command::Help
    );
}

#[test]
fn test_verbose_anywhere() {
    let args = Args::parse_from(["pendular", "--verbose", "config"]);
    assert!(args.verbose);
    // the first argument still selects the command
    assert_eq!(args.command, Command::Help);
}

// ============================================================================
// Output tests
// ============================================================================

#[test]
fn test_print_version_and_help() {
    print_version();
    print_help();
}

#[test]
fn test_print_reports_from_short_run() {
    let engine = SimEngine::new(SimConfig::builder().duration(1.0).samples(50).build()).unwrap();
    let outcome = engine.run().unwrap();
    print_run_report(&outcome.report, false);
    print_run_report(&outcome.report, true);
    print_divergence_table(&outcome.report.analysis.divergence);
    print_entropy_table("original", &outcome.report.analysis.baseline_entropy);
}

#[test]
fn test_print_reproducibility_both_outcomes() {
    print_reproducibility(&ReproducibilityReport {
        scenario: "original".to_string(),
        fingerprints: vec!["abc".to_string(); 3],
    });
    print_reproducibility(&ReproducibilityReport {
        scenario: "original".to_string(),
        fingerprints: vec!["abc".to_string(), "def".to_string()],
    });
    print_written_files(&[]);
    print_written_files(&[PathBuf::from("data/x.csv")]);
}

// ============================================================================
// Command handler tests
// ============================================================================

#[test]
fn test_run_cli_help() {
    let exit = run_cli(Args::parse_from(["pendular", "help"]));
    assert_eq!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_run_cli_version() {
    let exit = run_cli(Args::parse_from(["pendular", "version"]));
    assert_eq!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_print_default_config() {
    assert_eq!(print_default_config(), ExitCode::SUCCESS);
}

#[test]
fn test_run_experiment_file_not_found() {
    let exit = run_experiment(Path::new("nonexistent.yaml"), None, false, false, false);
    assert_ne!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_verify_reproducibility_file_not_found() {
    let exit = verify_reproducibility(Path::new("nonexistent.yaml"), 3);
    assert_ne!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_analyze_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let exit = analyze(
        Path::new("nonexistent_a.csv"),
        Path::new("nonexistent_b.csv"),
        Some(dir.path().to_path_buf()),
        false,
    );
    assert_ne!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_load_config_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");

    let config = load_config(&path, None, false).unwrap();
    assert_eq!(config.samples, 100);
    assert_eq!(config.output.directory, dir.path().join("out"));
    assert!(config.output.parallel);

    let config = load_config(&path, Some(PathBuf::from("elsewhere")), true).unwrap();
    assert_eq!(config.output.directory, PathBuf::from("elsewhere"));
    assert!(!config.output.parallel);
}

#[test]
fn test_run_experiment_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");

    let exit = run_experiment(&path, None, false, false, false);
    assert_eq!(exit, ExitCode::SUCCESS);

    let out = dir.path().join("out");
    for name in [
        "double_pendulum_original.csv",
        "double_pendulum_modified.csv",
        "ks_test_results.csv",
        "original_entropy_scores_and_interpretations.csv",
        "perturbed_entropy_scores_and_interpretations.csv",
    ] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let baseline = export::load_trajectory_csv(&out.join("double_pendulum_original.csv")).unwrap();
    assert_eq!(baseline.len(), 100);

    let ks = std::fs::read_to_string(out.join("ks_test_results.csv")).unwrap();
    assert_eq!(ks.lines().next(), Some(export::DIVERGENCE_HEADER));
    assert_eq!(ks.lines().count(), 10);
}

#[test]
fn test_run_experiment_json_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    let exit = run_experiment(&path, None, true, true, false);
    assert_eq!(exit, ExitCode::SUCCESS);
}

#[test]
fn test_run_experiment_invalid_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "parameters: {m1: 2.0, m2: 1.0, l1: 0.0, l2: 1.0, g: 9.8}\n");
    let exit = run_experiment(&path, None, false, false, false);
    assert_ne!(exit, ExitCode::SUCCESS);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_write_outputs_with_binary_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SimConfig::builder()
        .duration(0.5)
        .samples(20)
        .output_dir(dir.path())
        .build();
    config.output.write_binary = true;

    let engine = SimEngine::new(config).unwrap();
    let outcome = engine.run().unwrap();
    let written = write_outputs(&engine.config().output, &outcome).unwrap();
    assert_eq!(written.len(), 7);

    let snapshot = export::load_binary(&dir.path().join("original.bin")).unwrap();
    assert_eq!(snapshot, outcome.baseline.trajectory);
}

#[test]
fn test_simulate_then_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    let out = dir.path().join("out");

    assert_eq!(simulate(&path, None), ExitCode::SUCCESS);
    assert!(!out.join("ks_test_results.csv").exists());

    let reports = dir.path().join("reports");
    let exit = analyze(
        &out.join("double_pendulum_original.csv"),
        &out.join("double_pendulum_modified.csv"),
        Some(reports.clone()),
        true,
    );
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(reports.join("ks_test_results.csv").exists());
    assert!(reports
        .join("original_entropy_scores_and_interpretations.csv")
        .exists());
}

#[test]
fn test_verify_reproducibility_short_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    assert_eq!(verify_reproducibility(&path, 2), ExitCode::SUCCESS);
}
