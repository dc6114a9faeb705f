//! Per-invocation context bundle.

use super::provider::Value;
use crate::platform::{AgentTask, LabelRow, Platform, Project};
use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// The field of a [`Context`] a typed parameter is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    /// The whole context.
    Context,
    Project,
    Task,
    LabelRow,
}

impl ContextField {
    /// Map a declared parameter type to the context field that supplies it.
    pub fn for_type(type_id: TypeId) -> Option<Self> {
        if type_id == TypeId::of::<Context>() {
            Some(ContextField::Context)
        } else if type_id == TypeId::of::<Project>() {
            Some(ContextField::Project)
        } else if type_id == TypeId::of::<AgentTask>() {
            Some(ContextField::Task)
        } else if type_id == TypeId::of::<LabelRow>() {
            Some(ContextField::LabelRow)
        } else {
            None
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextField::Context => write!(f, "context"),
            ContextField::Project => write!(f, "project"),
            ContextField::Task => write!(f, "task"),
            ContextField::LabelRow => write!(f, "label row"),
        }
    }
}

/// Input bundle of one invocation: the platform plus the project, task and
/// label row of the current work item.
///
/// Built fresh for every item. Fields are optional so providers can be
/// resolved outside the runner; a parameter needing an absent field fails
/// with [`super::ResolveError::MissingContext`].
#[derive(Clone)]
pub struct Context {
    platform: Rc<dyn Platform>,
    project: Option<Rc<Project>>,
    task: Option<Rc<AgentTask>>,
    label_row: Option<Rc<LabelRow>>,
}

impl Context {
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        Self {
            platform,
            project: None,
            task: None,
            label_row: None,
        }
    }

    pub fn with_project(mut self, project: Rc<Project>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_task(mut self, task: Rc<AgentTask>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_label_row(mut self, label_row: Rc<LabelRow>) -> Self {
        self.label_row = Some(label_row);
        self
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn project(&self) -> Option<&Rc<Project>> {
        self.project.as_ref()
    }

    pub fn task(&self) -> Option<&Rc<AgentTask>> {
        self.task.as_ref()
    }

    pub fn label_row(&self) -> Option<&Rc<LabelRow>> {
        self.label_row.as_ref()
    }

    pub(crate) fn field(&self, field: ContextField) -> Option<Value> {
        match field {
            ContextField::Context => Some(Rc::new(self.clone()) as Rc<dyn Any>),
            ContextField::Project => self.project.clone().map(|p| p as Rc<dyn Any>),
            ContextField::Task => self.task.clone().map(|t| t as Rc<dyn Any>),
            ContextField::LabelRow => self.label_row.clone().map(|r| r as Rc<dyn Any>),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("project", &self.project.as_ref().map(|p| p.id))
            .field("task", &self.task.as_ref().map(|t| t.uuid))
            .field("label_row", &self.label_row.as_ref().map(|r| r.data_id))
            .finish_non_exhaustive()
    }
}
