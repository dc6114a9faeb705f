//! In-memory platform used for tests and local dry runs.

use super::types::{AgentTask, LabelRow, Pathway, Project, StageType, Submission, WorkflowStage};
use super::{Platform, PlatformError};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use uuid::Uuid;

/// A call received by a [`MemoryPlatform`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Project(Uuid),
    WorkflowStages(Uuid),
    PendingTasks { stage: Uuid },
    LabelRows { data_ids: Vec<Uuid> },
    InitialiseLabels { data_ids: Vec<Uuid> },
    Submit { submissions: Vec<Submission> },
    DownloadAsset(Uuid),
    LabelRowsByTitle(String),
}

#[derive(Debug)]
struct StoredTask {
    uuid: Uuid,
    data_id: Uuid,
    stage_uuid: Uuid,
}

#[derive(Debug)]
struct ProjectState {
    project: Project,
    stages: Vec<WorkflowStage>,
    tasks: Vec<StoredTask>,
    rows: Vec<LabelRow>,
    assets: HashMap<Uuid, Vec<u8>>,
}

impl ProjectState {
    fn agent_task(&self, task: &StoredTask) -> Option<AgentTask> {
        let stage = self.stages.iter().find(|s| s.uuid == task.stage_uuid)?;
        let row = self.rows.iter().find(|r| r.data_id == task.data_id)?;
        Some(AgentTask {
            uuid: task.uuid,
            data_id: task.data_id,
            data_title: row.data_title.clone(),
            stage_uuid: stage.uuid,
            pathways: stage.pathways.clone(),
        })
    }
}

/// A [`Platform`] backed by in-process state.
///
/// Workflows are assembled with the `add_*` methods. Submissions move tasks
/// along their pathway: to the destination stage if it has one, out of the
/// workflow otherwise. A bundle holding one invalid submission is rejected
/// whole.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    projects: RefCell<Vec<ProjectState>>,
    calls: RefCell<Vec<PlatformCall>>,
    fail_submissions: Cell<bool>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty project and return its id.
    pub fn add_project(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.projects.borrow_mut().push(ProjectState {
            project: Project {
                id,
                title: title.to_string(),
            },
            stages: Vec::new(),
            tasks: Vec::new(),
            rows: Vec::new(),
            assets: HashMap::new(),
        });
        id
    }

    /// Append a stage to the project's workflow and return its UUID.
    pub fn add_stage(
        &self,
        project_id: Uuid,
        title: &str,
        stage_type: StageType,
    ) -> Result<Uuid, PlatformError> {
        self.with_project(project_id, |state| {
            let uuid = Uuid::new_v4();
            state.stages.push(WorkflowStage {
                uuid,
                title: title.to_string(),
                stage_type,
                pathways: Vec::new(),
            });
            uuid
        })
    }

    /// Add an outgoing pathway to `stage` and return the pathway UUID.
    pub fn add_pathway(
        &self,
        project_id: Uuid,
        stage: Uuid,
        name: &str,
        destination: Option<Uuid>,
    ) -> Result<Uuid, PlatformError> {
        self.with_project(project_id, |state| -> Result<Uuid, PlatformError> {
            let stage = state
                .stages
                .iter_mut()
                .find(|s| s.uuid == stage)
                .ok_or_else(|| PlatformError::Request(format!("stage {} not found", stage)))?;
            let uuid = Uuid::new_v4();
            stage.pathways.push(Pathway {
                uuid,
                name: name.to_string(),
                destination,
            });
            Ok(uuid)
        })?
    }

    /// Create a data unit titled `data_title` with a task pending at `stage`.
    ///
    /// Returns the task UUID.
    pub fn add_task(
        &self,
        project_id: Uuid,
        stage: Uuid,
        data_title: &str,
    ) -> Result<Uuid, PlatformError> {
        self.with_project(project_id, |state| {
            let uuid = Uuid::new_v4();
            let data_id = Uuid::new_v4();
            let mut row = LabelRow::new(data_id, data_title);
            row.labels = json!({ "objects": [], "classifications": [] });
            state.rows.push(row);
            state.tasks.push(StoredTask {
                uuid,
                data_id,
                stage_uuid: stage,
            });
            uuid
        })
    }

    /// Attach downloadable content to a data unit.
    pub fn set_asset(
        &self,
        project_id: Uuid,
        data_id: Uuid,
        content: Vec<u8>,
    ) -> Result<(), PlatformError> {
        self.with_project(project_id, |state| {
            state.assets.insert(data_id, content);
        })
    }

    /// Data unit id of a task.
    pub fn data_id_of(&self, project_id: Uuid, task: Uuid) -> Option<Uuid> {
        self.with_project(project_id, |state| {
            state.tasks.iter().find(|t| t.uuid == task).map(|t| t.data_id)
        })
        .ok()
        .flatten()
    }

    /// Stage a task currently sits at, or `None` once it has left the workflow.
    pub fn stage_of(&self, project_id: Uuid, task: Uuid) -> Option<Uuid> {
        self.with_project(project_id, |state| {
            state
                .tasks
                .iter()
                .find(|t| t.uuid == task)
                .map(|t| t.stage_uuid)
        })
        .ok()
        .flatten()
    }

    /// Make every subsequent `submit` call fail (or succeed again).
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.set(fail);
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.borrow().clone()
    }

    /// The data ids of every bulk label-row listing, one entry per request.
    pub fn label_row_requests(&self) -> Vec<Vec<Uuid>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::LabelRows { data_ids } => Some(data_ids.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every submitted bundle, one entry per `submit` request.
    pub fn submissions(&self) -> Vec<Vec<Submission>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Submit { submissions } => Some(submissions.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.borrow_mut().push(call);
    }

    fn with_project<R>(
        &self,
        project_id: Uuid,
        f: impl FnOnce(&mut ProjectState) -> R,
    ) -> Result<R, PlatformError> {
        let mut projects = self.projects.borrow_mut();
        let state = projects
            .iter_mut()
            .find(|p| p.project.id == project_id)
            .ok_or(PlatformError::ProjectNotFound(project_id))?;
        Ok(f(state))
    }
}

impl Platform for MemoryPlatform {
    fn project(&self, project_id: Uuid) -> Result<Project, PlatformError> {
        self.record(PlatformCall::Project(project_id));
        self.with_project(project_id, |state| state.project.clone())
    }

    fn workflow_stages(&self, project: &Project) -> Result<Vec<WorkflowStage>, PlatformError> {
        self.record(PlatformCall::WorkflowStages(project.id));
        self.with_project(project.id, |state| state.stages.clone())
    }

    fn pending_tasks(
        &self,
        project: &Project,
        stage: &WorkflowStage,
    ) -> Result<Vec<AgentTask>, PlatformError> {
        self.record(PlatformCall::PendingTasks { stage: stage.uuid });
        self.with_project(project.id, |state| {
            state
                .tasks
                .iter()
                .filter(|t| t.stage_uuid == stage.uuid)
                .filter_map(|t| state.agent_task(t))
                .collect()
        })
    }

    fn label_rows(
        &self,
        project: &Project,
        data_ids: &[Uuid],
    ) -> Result<Vec<LabelRow>, PlatformError> {
        self.record(PlatformCall::LabelRows {
            data_ids: data_ids.to_vec(),
        });
        self.with_project(project.id, |state| {
            state
                .rows
                .iter()
                .filter(|r| data_ids.contains(&r.data_id))
                .map(|r| LabelRow {
                    initialised: false,
                    labels: serde_json::Value::Null,
                    ..r.clone()
                })
                .collect()
        })
    }

    fn initialise_labels(
        &self,
        project: &Project,
        rows: &mut [LabelRow],
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::InitialiseLabels {
            data_ids: rows.iter().map(|r| r.data_id).collect(),
        });
        self.with_project(project.id, |state| {
            for row in rows.iter_mut() {
                if let Some(stored) = state.rows.iter().find(|r| r.data_id == row.data_id) {
                    row.labels = stored.labels.clone();
                }
                row.initialised = true;
            }
        })
    }

    fn submit(&self, project: &Project, submissions: &[Submission]) -> Result<(), PlatformError> {
        self.record(PlatformCall::Submit {
            submissions: submissions.to_vec(),
        });
        if self.fail_submissions.get() {
            return Err(PlatformError::Request(
                "submission bundle rejected".to_string(),
            ));
        }
        self.with_project(project.id, |state| {
            // Check the whole bundle before moving anything.
            let mut moves = Vec::with_capacity(submissions.len());
            for submission in submissions {
                let Some(task) = state.tasks.iter().find(|t| t.uuid == submission.task) else {
                    return Err(PlatformError::Request(format!(
                        "task {} is not pending",
                        submission.task
                    )));
                };
                let pathway = state
                    .stages
                    .iter()
                    .find(|s| s.uuid == task.stage_uuid)
                    .and_then(|s| s.pathways.iter().find(|p| p.uuid == submission.pathway))
                    .ok_or_else(|| {
                        PlatformError::Request(format!(
                            "pathway {} does not leave the stage of task {}",
                            submission.pathway, submission.task
                        ))
                    })?;
                moves.push((submission.task, pathway.destination));
            }

            for (task, destination) in moves {
                match destination {
                    Some(destination) => {
                        if let Some(stored) = state.tasks.iter_mut().find(|t| t.uuid == task) {
                            stored.stage_uuid = destination;
                        }
                    }
                    None => state.tasks.retain(|t| t.uuid != task),
                }
            }
            Ok(())
        })?
    }

    fn download_asset(&self, project: &Project, row: &LabelRow) -> Result<Vec<u8>, PlatformError> {
        self.record(PlatformCall::DownloadAsset(row.data_id));
        self.with_project(project.id, |state| state.assets.get(&row.data_id).cloned())?
            .ok_or(PlatformError::AssetUnavailable(row.data_id))
    }

    fn label_rows_by_title(
        &self,
        project: &Project,
        data_title: &str,
    ) -> Result<Vec<LabelRow>, PlatformError> {
        self.record(PlatformCall::LabelRowsByTitle(data_title.to_string()));
        self.with_project(project.id, |state| {
            state
                .rows
                .iter()
                .filter(|r| r.data_title == data_title)
                .map(|r| LabelRow {
                    initialised: false,
                    labels: serde_json::Value::Null,
                    ..r.clone()
                })
                .collect()
        })
    }
}
