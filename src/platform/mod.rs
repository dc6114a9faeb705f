//! Interface to the labeling platform.
//!
//! The runner never talks to the network directly. Everything it needs from the
//! remote platform goes through the [`Platform`] trait:
//!
//! - project and workflow lookup (startup validation)
//! - listing pending tasks of an agent stage
//! - bulk label-row listing and initialisation (batch hydration)
//! - bundled routing submissions
//! - asset download and title lookup (used by the built-in providers)
//!
//! All calls are blocking. [`MemoryPlatform`] is an in-memory implementation
//! that records every call, used for tests and local dry runs.

mod memory;
mod types;

pub use memory::{MemoryPlatform, PlatformCall};
pub use types::{
    AgentTask, Identifier, LabelRow, Pathway, Project, StageType, Submission, WorkflowStage,
};

use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a [`Platform`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("project {0} not found or not accessible")]
    ProjectNotFound(Uuid),

    #[error("no asset available for data unit {0}")]
    AssetUnavailable(Uuid),

    /// Transport or server-side failure.
    #[error("{0}")]
    Request(String),
}

/// Blocking client of the labeling platform.
pub trait Platform {
    /// Fetch a project by id.
    fn project(&self, project_id: Uuid) -> Result<Project, PlatformError>;

    /// All stages of the project's workflow, of every type.
    fn workflow_stages(&self, project: &Project) -> Result<Vec<WorkflowStage>, PlatformError>;

    /// Tasks currently pending at `stage`, in platform order.
    fn pending_tasks(
        &self,
        project: &Project,
        stage: &WorkflowStage,
    ) -> Result<Vec<AgentTask>, PlatformError>;

    /// Bulk-list the label rows of the given data units in one request.
    ///
    /// Rows may come back in any order; unknown ids are omitted.
    fn label_rows(&self, project: &Project, data_ids: &[Uuid])
    -> Result<Vec<LabelRow>, PlatformError>;

    /// Load the labels of all `rows` in one bundled request and mark them initialised.
    fn initialise_labels(&self, project: &Project, rows: &mut [LabelRow])
    -> Result<(), PlatformError>;

    /// Commit a bundle of routing decisions in one request.
    fn submit(&self, project: &Project, submissions: &[Submission]) -> Result<(), PlatformError>;

    /// Download the media content backing a label row.
    fn download_asset(&self, project: &Project, row: &LabelRow) -> Result<Vec<u8>, PlatformError>;

    /// Label rows of the project whose data title equals `data_title`.
    fn label_rows_by_title(
        &self,
        project: &Project,
        data_title: &str,
    ) -> Result<Vec<LabelRow>, PlatformError>;
}
