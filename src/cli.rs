// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every flag that a CGI-style host would rather set through the
//! environment has an env fallback, so `taskstream` can run unchanged
//! behind websocketd.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskstream",
    version,
    about = "Run one declared task and stream its output as line-delimited JSON events.",
    long_about = None
)]
pub struct CliArgs {
    /// Task identifier; the task is read from `<tasks-dir>/<ID>.json`.
    ///
    /// If omitted, the `task` query parameter is used.
    #[arg(long, env = "TASKSTREAM_TASK", value_name = "ID")]
    pub task: Option<String>,

    /// Directory holding task descriptions.
    #[arg(long, env = "TASKSTREAM_TASKS_DIR", value_name = "DIR", default_value = ".")]
    pub tasks_dir: PathBuf,

    /// Request query string; each parameter becomes a `QS_<name>` variable.
    #[arg(long, env = "QUERY_STRING", value_name = "QS", default_value = "")]
    pub query: String,

    /// Allowed request origin (repeatable). When given, `HTTP_ORIGIN` must
    /// match one of them.
    #[arg(long = "origin", value_name = "ORIGIN")]
    pub origins: Vec<String>,

    /// Reject unknown properties and invalid option values.
    #[arg(long)]
    pub strict: bool,

    /// Validate and print the resolved command and options; run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let args = CliArgs::try_parse_from([
            "taskstream",
            "--task",
            "build",
            "--tasks-dir",
            "/srv/tasks",
            "--origin",
            "https://a.example",
            "--origin",
            "https://b.example",
            "--strict",
            "--dry-run",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.task.as_deref(), Some("build"));
        assert_eq!(args.tasks_dir, PathBuf::from("/srv/tasks"));
        assert_eq!(args.origins, vec!["https://a.example", "https://b.example"]);
        assert!(args.strict);
        assert!(args.dry_run);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }
}
