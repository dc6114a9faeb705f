//! Routing decisions and the per-batch submission bundle.

use crate::platform::{AgentTask, Identifier, Platform, PlatformError, Project, Submission};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What a stage agent decided for the task it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Advance the task along the pathway with this name or UUID.
    Pathway(Identifier),
    /// Leave the task where it is for this pass.
    NoDecision,
}

impl Routing {
    /// Route along the pathway identified by `pathway`.
    pub fn to(pathway: impl Into<Identifier>) -> Self {
        Routing::Pathway(pathway.into())
    }
}

impl<T: Into<Identifier>> From<Option<T>> for Routing {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(pathway) => Routing::Pathway(pathway.into()),
            None => Routing::NoDecision,
        }
    }
}

/// A routing decision the platform would reject.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error(
        "pathway `{pathway}` is not a valid pathway for task {task}. \
         Valid pathways are: [{available}]"
    )]
    InvalidPathway {
        pathway: Identifier,
        task: Uuid,
        available: String,
    },
}

/// Outbound routing submissions of one batch, flushed in a single request.
///
/// Pathways are checked against the task's current stage when appended, so a
/// wrong pathway fails the item that produced it instead of the whole flush.
#[derive(Debug, Default)]
pub struct RoutingBundle {
    submissions: Vec<Submission>,
}

impl RoutingBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to advance along `pathway`.
    pub fn proceed(
        &mut self,
        task: &AgentTask,
        pathway: &Identifier,
    ) -> Result<(), SubmissionError> {
        let resolved = task
            .pathway(pathway)
            .ok_or_else(|| SubmissionError::InvalidPathway {
                pathway: pathway.clone(),
                task: task.uuid,
                available: task
                    .pathways
                    .iter()
                    .map(|p| format!("`{}`", p.name))
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        self.submissions.push(Submission {
            task: task.uuid,
            pathway: resolved.uuid,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Commit all queued submissions. An empty bundle makes no request.
    ///
    /// Returns the number of submissions sent.
    pub fn flush(self, platform: &dyn Platform, project: &Project) -> Result<usize, PlatformError> {
        if self.submissions.is_empty() {
            return Ok(0);
        }
        platform.submit(project, &self.submissions)?;
        Ok(self.submissions.len())
    }
}
