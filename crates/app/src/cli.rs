//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Execute API test suites against a live target.
#[derive(Parser, Debug)]
#[command(name = "apiprobe", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML, JSON or YAML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level and record assertion details.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one suite and print a summary.
    Run(RunArgs),
    /// Submit suites to the scheduler and wait for them.
    Schedule(ScheduleArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite file (.json, .yaml or .yml).
    pub suite: PathBuf,

    /// Base URL overriding the suite's own.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum number of cases in flight.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write the JSON result to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `schedule`.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Suite files, submitted in order.
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// Base URL overriding each suite's own.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Priority for every submitted task (higher runs first when enabled).
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub priority: i32,

    /// Delay before the tasks become eligible.
    #[arg(long, default_value_t = 0)]
    pub delay_secs: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "apiprobe",
            "run",
            "suite.yaml",
            "--base-url",
            "http://localhost:8080",
            "--concurrency",
            "3",
            "-o",
            "out.json",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.suite, PathBuf::from("suite.yaml"));
                assert_eq!(args.base_url.as_deref(), Some("http://localhost:8080"));
                assert_eq!(args.concurrency, Some(3));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            Command::Schedule(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_schedule_defaults() {
        let cli = Cli::try_parse_from([
            "apiprobe",
            "-c",
            "apiprobe.toml",
            "schedule",
            "a.json",
            "b.yml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("apiprobe.toml")));
        match cli.command {
            Command::Schedule(args) => {
                assert_eq!(args.suites.len(), 2);
                assert_eq!(args.priority, 5);
                assert_eq!(args.delay_secs, 0);
            }
            Command::Run(_) => panic!("expected schedule"),
        }
    }

    #[test]
    fn test_schedule_requires_a_suite() {
        assert!(Cli::try_parse_from(["apiprobe", "schedule"]).is_err());
    }
}
