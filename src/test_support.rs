//! Workflow fixtures shared by unit tests.

use crate::platform::{MemoryPlatform, Platform, StageType};
use crate::runner::Runner;
use std::rc::Rc;
use uuid::Uuid;

pub(crate) const AGENT_STAGE: &str = "Agent 1";

/// A project whose workflow is
/// `Annotate -> Agent 1 -(complete)-> Complete`, with a second pathway
/// `Agent 1 -(review)-> Review`.
pub(crate) struct Workflow {
    pub(crate) platform: Rc<MemoryPlatform>,
    pub(crate) project: Uuid,
    pub(crate) agent_stage: Uuid,
    pub(crate) review_stage: Uuid,
    pub(crate) complete_stage: Uuid,
}

impl Workflow {
    pub(crate) fn new() -> Self {
        let platform = Rc::new(MemoryPlatform::new());
        let project = platform.add_project("fixture");

        platform
            .add_stage(project, "Annotate", StageType::Annotation)
            .unwrap();
        let agent_stage = platform
            .add_stage(project, AGENT_STAGE, StageType::Agent)
            .unwrap();
        let review_stage = platform
            .add_stage(project, "Review", StageType::Review)
            .unwrap();
        let complete_stage = platform
            .add_stage(project, "Complete", StageType::Complete)
            .unwrap();
        platform
            .add_pathway(project, agent_stage, "complete", Some(complete_stage))
            .unwrap();
        platform
            .add_pathway(project, agent_stage, "review", Some(review_stage))
            .unwrap();

        Self {
            platform,
            project,
            agent_stage,
            review_stage,
            complete_stage,
        }
    }

    /// Add `count` tasks titled `0.jpg`, `1.jpg`, ... pending at the agent stage.
    pub(crate) fn add_tasks(&self, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|i| {
                self.platform
                    .add_task(self.project, self.agent_stage, &format!("{}.jpg", i))
                    .unwrap()
            })
            .collect()
    }

    pub(crate) fn platform(&self) -> Rc<dyn Platform> {
        self.platform.clone()
    }

    /// A runner bound to the fixture project.
    pub(crate) fn runner(&self) -> Runner {
        Runner::for_project(self.platform(), &self.project.to_string()).unwrap()
    }

    /// Where `task` currently sits; `None` once it left the workflow.
    pub(crate) fn stage_of(&self, task: Uuid) -> Option<Uuid> {
        self.platform.stage_of(self.project, task)
    }
}
