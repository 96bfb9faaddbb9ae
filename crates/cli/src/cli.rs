//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Daily event stats pipeline: fetch a window of events, count them per day and user.
#[derive(Parser, Debug)]
#[command(
    name = "event-stats",
    version,
    about = "Fetch daily event batches and write per-day per-user counts",
    long_about = "Runs the two-task event stats DAG (fetch_events >> calculate_stats) for one \n\
                  batch window. Scheduling and retries are left to whatever invokes this binary."
)]
pub struct Cli {
    /// Configuration file (TOML). Missing default file means built-in defaults.
    #[arg(short, long, global = true, env = "EVENT_STATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the event service base URL
    #[arg(long, global = true, env = "EVENT_STATS_BASE_URL")]
    pub base_url: Option<String>,

    /// Override the directory raw and aggregated files are written to
    #[arg(long, global = true, env = "EVENT_STATS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "EVENT_STATS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the DAG (or one task of it) for a batch window
    Run(RunArgs),

    /// Run only fetch_events for a batch window
    Fetch(WindowArgs),

    /// Run only calculate_stats for a batch window
    Stats(WindowArgs),

    /// Print the DAG: schedule, tasks and execution order
    Show(ShowArgs),
}

/// Selects the batch window.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Logical date (YYYY-MM-DD). Defaults to the latest complete window.
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Run a single task, ignoring its upstream dependencies
    #[arg(short, long)]
    pub task: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable multi-line format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_date_and_task() {
        let cli = Cli::try_parse_from([
            "event-stats",
            "run",
            "--date",
            "2023-11-01",
            "--task",
            "calculate_stats",
            "--json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.window.date, NaiveDate::from_ymd_opt(2023, 11, 1));
        assert_eq!(args.task.as_deref(), Some("calculate_stats"));
        assert!(args.window.json);
    }

    #[test]
    fn quiet_help_matches_its_filter() {
        let command = Cli::command();
        let quiet = command
            .get_arguments()
            .find(|arg| arg.get_id() == "quiet")
            .unwrap();
        assert_eq!(quiet.get_help().unwrap().to_string(), "Only log warnings and errors");
        assert_eq!(crate::observability::default_directive(true, 0), "warn");
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["event-stats", "fetch", "--date", "11/01/2023"]).is_err());
    }

    #[test]
    fn global_overrides_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "event-stats",
            "show",
            "--data-dir",
            "/var/lib/events",
            "-vv",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/var/lib/events")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
