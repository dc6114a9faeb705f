//! RunOptions loading and validation.

use super::model::RunOptions;
use super::types::RunSettings;
use crate::error::{Result, RunnerError};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

impl RunOptions {
    /// Load options from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(RunOptions)` - Successfully loaded and validated options
    /// * `Err(RunnerError::Io)` - The file could not be read
    /// * `Err(RunnerError::Config)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Io(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(RunOptions::default());
        }
        let options: RunOptions = serde_yaml::from_str(yaml)
            .map_err(|e| RunnerError::Config(format!("failed to parse config YAML: {}", e)))?;

        options.validate()?;
        Ok(options)
    }

    /// Serialize options to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| RunnerError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate option values and convert them to [`RunSettings`].
    ///
    /// Validation rules:
    /// - `max_attempts` and `batch_size` must be positive
    /// - `max_tasks_per_stage` must be positive when set
    /// - `polling_interval_seconds` must not be negative
    /// - `project_id` must be a UUID when set
    pub fn validate(&self) -> Result<RunSettings> {
        let max_attempts = positive("max_attempts", self.max_attempts)?;
        let batch_size = positive("batch_size", self.batch_size)?;
        let max_tasks_per_stage = self
            .max_tasks_per_stage
            .map(|n| positive("max_tasks_per_stage", n))
            .transpose()?;

        let polling_interval = match self.polling_interval_seconds {
            None | Some(0) => None,
            Some(secs) if secs < 0 => {
                return Err(RunnerError::Config(format!(
                    "config validation failed: polling_interval_seconds must not be negative (got {})",
                    secs
                )));
            }
            Some(secs) => Some(Duration::from_secs(secs.unsigned_abs())),
        };

        let project_id = self
            .project_id
            .as_deref()
            .map(parse_project_id)
            .transpose()?;

        Ok(RunSettings {
            polling_interval,
            max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
            batch_size: usize::try_from(batch_size).unwrap_or(usize::MAX),
            max_tasks_per_stage: max_tasks_per_stage
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            project_id,
            events_path: self.events_path.clone(),
        })
    }
}

/// Parse a project identifier, which must be a UUID.
pub fn parse_project_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| RunnerError::InvalidProjectId(raw.to_string()))
}

fn positive(field: &str, value: i64) -> Result<u64> {
    if value <= 0 {
        return Err(RunnerError::Config(format!(
            "config validation failed: {} must be greater than 0 (got {})",
            field, value
        )));
    }
    Ok(value.unsigned_abs())
}
