// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `command-runner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "command-runner",
    version,
    about = "Run a set of commands in dependency order, waiting for each to be ready.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: PathBuf,

    /// Enable debug messages (same as `--log-level debug`).
    #[arg(short, long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Takes precedence over `--debug`. If neither is given,
    /// `COMMAND_RUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the command graph, but don't spawn anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The level requested on the command line, if any.
    pub fn requested_log_level(&self) -> Option<LogLevel> {
        match (self.log_level, self.debug) {
            (Some(level), _) => Some(level),
            (None, true) => Some(LogLevel::Debug),
            (None, false) => None,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_flag_wins_over_debug() {
        let args = CliArgs::parse_from(["command-runner", "-c", "run.json", "-d", "--log-level", "warn"]);
        assert_eq!(args.requested_log_level(), Some(LogLevel::Warn));

        let args = CliArgs::parse_from(["command-runner", "--config", "run.json", "--debug"]);
        assert_eq!(args.requested_log_level(), Some(LogLevel::Debug));

        let args = CliArgs::parse_from(["command-runner", "-c", "run.json"]);
        assert_eq!(args.requested_log_level(), None);
    }

    #[test]
    fn config_is_required() {
        assert!(CliArgs::try_parse_from(["command-runner"]).is_err());
    }
}
