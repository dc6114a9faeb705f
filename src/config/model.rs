//! RunOptions struct definition and default implementation.

use super::types::*;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for one run of the stage agents.
///
/// Numbers are signed so that nonsensical values given on the command line or
/// in YAML reach [`RunOptions::validate`] and get a proper message instead of
/// a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    // =========================================================================
    // Execution
    // =========================================================================
    /// Seconds between the starts of two sweeps. `None` or `0` runs one sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval_seconds: Option<i64>,

    /// Attempts per task before it is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Tasks hydrated and submitted together.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,

    /// Upper bound on tasks taken from one stage per sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tasks_per_stage: Option<i64>,

    /// Project to run against; overrides the project bound to the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    // =========================================================================
    // Observability
    // =========================================================================
    /// Log filter directive (e.g. `info`, `stagehand=debug`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Append an NDJSON audit record per routed or abandoned task here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            polling_interval_seconds: None,
            max_attempts: default_max_attempts(),
            batch_size: default_batch_size(),
            max_tasks_per_stage: None,
            project_id: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            events_path: None,
        }
    }
}
