//! CLI argument parsing.
//!
//! This module provides the argument parser for the pendular CLI.
//! Parsing works on any iterator of strings so it can be tested without
//! touching the process environment.

use std::path::PathBuf;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
    /// `-v` / `--verbose` given anywhere on the command line.
    pub verbose: bool,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Integrate both scenarios, analyze them and write every output file
    Run {
        /// Path to the configuration YAML file.
        config_path: PathBuf,
        /// Output directory override.
        out_dir: Option<PathBuf>,
        /// Integrate the scenarios one after the other.
        sequential: bool,
        /// Print the run report as JSON.
        json: bool,
    },
    /// Verify bit-for-bit reproducibility of the baseline scenario
    Verify {
        /// Path to the configuration YAML file.
        config_path: PathBuf,
        /// Number of verification runs.
        runs: usize,
    },
    /// Integrate both scenarios and write the trajectory tables only
    Simulate {
        /// Path to the configuration YAML file.
        config_path: PathBuf,
        /// Output directory override.
        out_dir: Option<PathBuf>,
    },
    /// Analyze two existing trajectory CSV files
    Analyze {
        /// Baseline trajectory CSV.
        baseline_path: PathBuf,
        /// Perturbed trajectory CSV.
        perturbed_path: PathBuf,
        /// Directory for the report files.
        out_dir: Option<PathBuf>,
    },
    /// Print the default configuration as YAML
    Config,
    /// Show help
    Help,
    /// Show version
    Version,
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// This method is testable as it accepts any iterator of strings,
    /// not just `std::env::args()`.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    /// Internal parsing from a vector of strings.
    fn parse_from_vec(args: &[String]) -> Self {
        let verbose = args
            .iter()
            .skip(1)
            .any(|a| a == "-v" || a == "--verbose");

        if args.len() < 2 {
            return Self {
                command: Command::Help,
                verbose,
            };
        }

        let command = match args[1].as_str() {
            "run" => Self::parse_run_command(args),
            "verify" => Self::parse_verify_command(args),
            "simulate" => Self::parse_simulate_command(args),
            "analyze" => Self::parse_analyze_command(args),
            "config" => Command::Config,
            "-h" | "--help" | "help" => Command::Help,
            "-V" | "--version" | "version" => Command::Version,
            unknown => {
                eprintln!("Unknown command: {unknown}");
                Command::Help
            }
        };

        Self { command, verbose }
    }

    /// Value following `flag`, if present.
    fn option_value(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .filter(|v| !v.starts_with('-'))
            .cloned()
    }

    fn has_flag(args: &[String], flag: &str) -> bool {
        args.iter().any(|a| a == flag)
    }

    /// Parse the 'run' command arguments.
    fn parse_run_command(args: &[String]) -> Command {
        if args.len() < 3 || args[2].starts_with('-') {
            eprintln!("Error: 'run' command requires a configuration path");
            return Command::Help;
        }

        Command::Run {
            config_path: PathBuf::from(&args[2]),
            out_dir: Self::option_value(&args[3..], "--out").map(PathBuf::from),
            sequential: Self::has_flag(&args[3..], "--sequential"),
            json: Self::has_flag(&args[3..], "--json"),
        }
    }

    /// Parse the 'verify' command arguments.
    fn parse_verify_command(args: &[String]) -> Command {
        if args.len() < 3 || args[2].starts_with('-') {
            eprintln!("Error: 'verify' command requires a configuration path");
            return Command::Help;
        }

        let mut runs = 3;
        if let Some(value) = Self::option_value(&args[3..], "--runs") {
            match value.parse::<usize>() {
                Ok(n) if n > 0 => runs = n,
                _ => eprintln!("Warning: ignoring invalid --runs value '{value}'"),
            }
        }

        Command::Verify {
            config_path: PathBuf::from(&args[2]),
            runs,
        }
    }

    /// Parse the 'simulate' command arguments.
    fn parse_simulate_command(args: &[String]) -> Command {
        if args.len() < 3 || args[2].starts_with('-') {
            eprintln!("Error: 'simulate' command requires a configuration path");
            return Command::Help;
        }

        Command::Simulate {
            config_path: PathBuf::from(&args[2]),
            out_dir: Self::option_value(&args[3..], "--out").map(PathBuf::from),
        }
    }

    /// Parse the 'analyze' command arguments.
    fn parse_analyze_command(args: &[String]) -> Command {
        if args.len() < 4 || args[2].starts_with('-') || args[3].starts_with('-') {
            eprintln!("Error: 'analyze' command requires two trajectory CSV paths");
            return Command::Help;
        }

        Command::Analyze {
            baseline_path: PathBuf::from(&args[2]),
            perturbed_path: PathBuf::from(&args[3]),
            out_dir: Self::option_value(&args[4..], "--out").map(PathBuf::from),
        }
    }
}
