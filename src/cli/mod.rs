//! CLI argument parsing for stage-agent programs.
//!
//! Uses clap derive macros for declarative argument definitions. A program
//! built on [`crate::runner::Runner`] gets these flags through `Runner::run`;
//! every flag overrides the same option from the `--config` file.

use crate::config::RunOptions;
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Run the registered stage agents against a labeling project.
///
/// Each sweep fetches the pending tasks of every registered agent stage,
/// runs the stage's agent on each of them and submits the routing decisions.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(author, version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct RunArgs {
    /// YAML file with run options.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds between sweeps; 0 or omitted runs a single sweep.
    #[arg(long, value_name = "SECONDS")]
    pub polling_interval: Option<i64>,

    /// Attempts per task before giving up on it.
    #[arg(long)]
    pub max_attempts: Option<i64>,

    /// Tasks hydrated and submitted together.
    #[arg(long)]
    pub batch_size: Option<i64>,

    /// Maximum tasks taken from each stage per sweep.
    #[arg(long)]
    pub max_tasks_per_stage: Option<i64>,

    /// Project UUID; overrides the project bound in code.
    #[arg(short, long, value_name = "UUID")]
    pub project: Option<String>,

    /// Log filter, e.g. `debug` or `stagehand=trace` (RUST_LOG wins).
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Append NDJSON audit events to this file.
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,
}

impl RunArgs {
    /// Parse command-line arguments, exiting with usage on error.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Overlay the flags that were given onto `options`.
    pub fn apply(&self, mut options: RunOptions) -> RunOptions {
        if let Some(secs) = self.polling_interval {
            options.polling_interval_seconds = Some(secs);
        }
        if let Some(n) = self.max_attempts {
            options.max_attempts = n;
        }
        if let Some(n) = self.batch_size {
            options.batch_size = n;
        }
        if let Some(n) = self.max_tasks_per_stage {
            options.max_tasks_per_stage = Some(n);
        }
        if let Some(project) = &self.project {
            options.project_id = Some(project.clone());
        }
        if let Some(level) = &self.log_level {
            options.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            options.log_format = format;
        }
        if let Some(path) = &self.events {
            options.events_path = Some(path.clone());
        }
        options
    }
}
