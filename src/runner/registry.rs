//! Stage agents keyed by stage identifier.

use crate::deps::{Args, Dependant};
use crate::error::{Result, RunnerError};
use crate::platform::{Identifier, StageType, WorkflowStage};
use crate::routing::Routing;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// User callable of a stage agent.
pub type AgentFn = dyn Fn(&Args) -> anyhow::Result<Routing>;

/// A callable bound to one agent stage, with its precomputed resolution plan.
#[derive(Clone)]
pub struct RunnerAgent {
    pub(crate) stage: Identifier,
    pub(crate) name: String,
    pub(crate) callable: Rc<AgentFn>,
    pub(crate) dependant: Dependant,
    /// UUID of the workflow stage `stage` resolved to, once known.
    pub(crate) stage_uuid: Option<Uuid>,
    pub(crate) overwrite: bool,
}

impl RunnerAgent {
    pub fn new(
        stage: Identifier,
        name: impl Into<String>,
        callable: Rc<AgentFn>,
        dependant: Dependant,
    ) -> Self {
        Self {
            stage,
            name: name.into(),
            callable,
            dependant,
            stage_uuid: None,
            overwrite: false,
        }
    }

    /// Record the workflow stage this agent's identifier resolved to.
    pub fn resolved_to(mut self, stage_uuid: Uuid) -> Self {
        self.stage_uuid = Some(stage_uuid);
        self
    }

    pub fn stage(&self) -> &Identifier {
        &self.stage
    }

    /// Name used in logs and error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependant(&self) -> &Dependant {
        &self.dependant
    }
}

impl fmt::Debug for RunnerAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerAgent")
            .field("stage", &self.stage)
            .field("name", &self.name)
            .field("params", &self.dependant.parameter_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Registered agents, one per stage, in registration order.
#[derive(Debug, Default)]
pub struct StageRegistry {
    agents: Vec<RunnerAgent>,
    index: HashMap<Identifier, usize>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `agent`. An existing agent for the same stage is an error unless
    /// `overwrite`, in which case it is replaced in place.
    ///
    /// Agents are the same stage when their identifiers are equal or, once
    /// resolved, when they point at the same workflow stage.
    pub fn register(&mut self, mut agent: RunnerAgent, overwrite: bool) -> Result<()> {
        agent.overwrite = overwrite;
        let existing = self.index.get(&agent.stage).copied().or_else(|| {
            let uuid = agent.stage_uuid?;
            self.agents.iter().position(|a| a.stage_uuid == Some(uuid))
        });

        match existing {
            Some(_) if !overwrite => Err(RunnerError::DuplicateStage(agent.stage)),
            Some(position) => {
                tracing::debug!(stage = %agent.stage, agent = %agent.name, "replacing stage agent");
                let stage = agent.stage.clone();
                let replaced = std::mem::replace(&mut self.agents[position], agent);
                if replaced.stage != stage {
                    self.index.remove(&replaced.stage);
                    self.index.insert(stage, position);
                }
                Ok(())
            }
            None => {
                self.index.insert(agent.stage.clone(), self.agents.len());
                self.agents.push(agent);
                Ok(())
            }
        }
    }

    pub fn get(&self, stage: &Identifier) -> Option<&RunnerAgent> {
        self.index.get(stage).map(|&i| &self.agents[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunnerAgent> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Check every registered stage against the project's workflow.
    ///
    /// Returns each agent with its workflow stage, in registration order. Two
    /// agents whose identifiers name the same stage (by title and by UUID) are
    /// a [`RunnerError::DuplicateStage`], unless the later one was registered
    /// with overwrite, in which case it takes the earlier one's place.
    pub fn validate(
        &self,
        stages: &[WorkflowStage],
    ) -> Result<Vec<(&RunnerAgent, WorkflowStage)>> {
        let mut matched: Vec<(&RunnerAgent, WorkflowStage)> =
            Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let stage = match_stage(&agent.stage, &agent.name, stages)?;
            match matched.iter().position(|(_, s)| s.uuid == stage.uuid) {
                Some(_) if !agent.overwrite => {
                    return Err(RunnerError::DuplicateStage(agent.stage.clone()));
                }
                Some(position) => matched[position] = (agent, stage),
                None => matched.push((agent, stage)),
            }
        }
        Ok(matched)
    }
}

/// Find the agent stage `stage` identifies among `stages`.
pub(crate) fn match_stage(
    stage: &Identifier,
    function: &str,
    stages: &[WorkflowStage],
) -> Result<WorkflowStage> {
    let available = || {
        stages
            .iter()
            .filter(|s| s.stage_type == StageType::Agent)
            .map(|s| format!("(`{}`, {})", s.title, s.uuid))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let Some(found) = stages.iter().find(|s| s.is_identified_by(stage)) else {
        return Err(RunnerError::UnknownStage {
            stage: stage.clone(),
            function: function.to_string(),
            available: available(),
        });
    };

    if found.stage_type != StageType::Agent {
        return Err(RunnerError::WrongStageType {
            stage: stage.clone(),
            stage_type: found.stage_type.to_string(),
            available: available(),
        });
    }

    Ok(found.clone())
}
