//! Validated settings and default value functions.

use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Run options after validation, in the types the runner works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// `None` means a single sweep.
    pub polling_interval: Option<Duration>,
    pub max_attempts: u32,
    pub batch_size: usize,
    pub max_tasks_per_stage: Option<usize>,
    pub project_id: Option<Uuid>,
    pub events_path: Option<PathBuf>,
}

pub(crate) fn default_max_attempts() -> i64 {
    3
}

pub(crate) fn default_batch_size() -> i64 {
    300
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
