//! Handles returned by the labeling platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A stage or pathway identifier: either a human-readable name or a UUID.
///
/// Strings that parse as a UUID are treated as UUIDs, so `"7e7598de-..."` and
/// `Uuid::parse_str("7e7598de-...")` identify the same stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Uuid(Uuid),
    Name(String),
}

impl Identifier {
    /// Parse an identifier, preferring the UUID interpretation.
    pub fn parse(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(uuid) => Identifier::Uuid(uuid),
            Err(_) => Identifier::Name(s.to_string()),
        }
    }

    /// Whether this identifier denotes the entity with the given UUID and name.
    pub fn matches(&self, uuid: &Uuid, name: &str) -> bool {
        match self {
            Identifier::Uuid(id) => id == uuid,
            Identifier::Name(n) => n == name,
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::parse(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::parse(&s)
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Identifier::Uuid(uuid)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Uuid(uuid) => write!(f, "{}", uuid),
            Identifier::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Kind of a workflow stage. Only [`StageType::Agent`] stages can be driven by a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Annotation,
    Review,
    Consensus,
    Agent,
    Complete,
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageType::Annotation => write!(f, "annotation"),
            StageType::Review => write!(f, "review"),
            StageType::Consensus => write!(f, "consensus"),
            StageType::Agent => write!(f, "agent"),
            StageType::Complete => write!(f, "complete"),
        }
    }
}

/// An outgoing edge of a workflow stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathway {
    pub uuid: Uuid,
    pub name: String,
    /// Stage the task lands in when routed along this pathway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Uuid>,
}

/// A project on the labeling platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
}

/// A stage of a project's task workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStage {
    pub uuid: Uuid,
    pub title: String,
    pub stage_type: StageType,
    #[serde(default)]
    pub pathways: Vec<Pathway>,
}

impl WorkflowStage {
    /// Whether `stage` identifies this stage by title or UUID.
    pub fn is_identified_by(&self, stage: &Identifier) -> bool {
        stage.matches(&self.uuid, &self.title)
    }
}

/// A pending work item sitting at an agent stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTask {
    pub uuid: Uuid,
    /// Identifier of the data unit the task refers to; keys the label row.
    pub data_id: Uuid,
    pub data_title: String,
    pub stage_uuid: Uuid,
    /// Pathways the task may be routed along from its current stage.
    #[serde(default)]
    pub pathways: Vec<Pathway>,
}

impl AgentTask {
    /// Look up a pathway of the task's current stage by name or UUID.
    pub fn pathway(&self, pathway: &Identifier) -> Option<&Pathway> {
        self.pathways
            .iter()
            .find(|p| pathway.matches(&p.uuid, &p.name))
    }
}

/// The label data of one data unit.
///
/// Rows returned by a bulk listing carry metadata only; `labels` is filled
/// once the row has been initialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    pub data_id: Uuid,
    pub data_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing_item: Option<Uuid>,
    #[serde(default)]
    pub client_metadata: serde_json::Value,
    #[serde(default)]
    pub initialised: bool,
    #[serde(default)]
    pub labels: serde_json::Value,
}

impl LabelRow {
    pub fn new(data_id: Uuid, data_title: impl Into<String>) -> Self {
        Self {
            data_id,
            data_title: data_title.into(),
            data_link: None,
            backing_item: None,
            client_metadata: serde_json::Value::Null,
            initialised: false,
            labels: serde_json::Value::Null,
        }
    }
}

/// One routing submission, resolved to the pathway's UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub task: Uuid,
    pub pathway: Uuid,
}
