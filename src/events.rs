//! Audit log of run activity.
//!
//! When an events path is configured, the runner appends one JSON object per
//! line (NDJSON) for every sweep, failed attempt, routing decision and bundle
//! flush, so a run can be reconstructed after the fact.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`sweep_start`, `routed`, `abandoned`, ...)
//! - `actor`: the process owner (e.g., `user@HOST`)
//! - `stage`: optional stage identifier
//! - `task`: optional task UUID
//! - `details`: freeform object with action-specific details
//!
//! ```no_run
//! use stagehand::events::{Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let mut log = EventLog::open("run/events.ndjson")?;
//! log.append(&Event::new(EventAction::SweepStart).with_details(json!({"sweep": 1})))?;
//! # Ok::<(), stagehand::error::RunnerError>(())
//! ```

use crate::error::{Result, RunnerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A sweep over all registered stages began
    SweepStart,
    /// A sweep finished
    SweepComplete,
    /// An attempt failed and may be retried
    AttemptFailed,
    /// A task was added to a submission bundle
    Routed,
    /// An agent made no routing decision
    NoDecision,
    /// A task was given up on
    Abandoned,
    /// A submission bundle was sent
    BundleFlushed,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::SweepStart => write!(f, "sweep_start"),
            EventAction::SweepComplete => write!(f, "sweep_complete"),
            EventAction::AttemptFailed => write!(f, "attempt_failed"),
            EventAction::Routed => write!(f, "routed"),
            EventAction::NoDecision => write!(f, "no_decision"),
            EventAction::Abandoned => write!(f, "abandoned"),
            EventAction::BundleFlushed => write!(f, "bundle_flushed"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// The actor running the agents (e.g., `user@HOST`).
    pub actor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            stage: None,
            task: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_stage(mut self, stage: impl ToString) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    pub fn with_task(mut self, task: impl ToString) -> Self {
        self.task = Some(task.to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RunnerError::Io(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// An open, append-only NDJSON event file.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                RunnerError::Io(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                RunnerError::Io(format!(
                    "failed to open events file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event` as one line.
    pub fn append(&mut self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        writeln!(self.file, "{}", json_line).map_err(|e| {
            RunnerError::Io(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        self.file.flush().map_err(|e| {
            RunnerError::Io(format!(
                "failed to flush events file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}
