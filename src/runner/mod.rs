//! Binding stage agents to workflow stages and running them.
//!
//! A [`Runner`] collects one agent per agent stage, then executes them against
//! a project: single pass by default, or sweeping on a polling interval.
//! Startup problems (bad options, unknown stages, missing project) are
//! returned as [`RunnerError`] before any task is touched. Problems with an
//! individual task are logged and reported in the [`RunReport`] instead.

mod execute;
mod registry;
mod report;

#[cfg(test)]
mod tests;

pub use registry::{AgentFn, RunnerAgent, StageRegistry};
pub use report::{AbandonReason, ItemOutcome, ItemReport, RunReport, SweepReport};

use crate::cli::RunArgs;
use crate::config::{RunOptions, parse_project_id};
use crate::deps::{Args, Dependant, Param};
use crate::error::{Result, RunnerError};
use crate::events::EventLog;
use crate::exit_codes;
use crate::logging::init_logging;
use crate::platform::{Identifier, Platform, Project, WorkflowStage};
use crate::routing::Routing;
use execute::TaskLoop;
use registry::match_stage;
use std::fmt;
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Registration options for a stage agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    stage: Identifier,
    name: Option<String>,
    overwrite: bool,
}

impl StageSpec {
    /// Target the stage with this title or UUID.
    pub fn new(stage: impl Into<Identifier>) -> Self {
        Self {
            stage: stage.into(),
            name: None,
            overwrite: false,
        }
    }

    /// Name the agent in logs and error messages (defaults to the stage).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace an agent already registered for the stage instead of failing.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

struct BoundProject {
    project: Rc<Project>,
    stages: Vec<WorkflowStage>,
}

/// Stage agents of one project workflow.
pub struct Runner {
    platform: Rc<dyn Platform>,
    bound: Option<BoundProject>,
    registry: StageRegistry,
}

impl Runner {
    /// A runner without a project; one must be given at run time.
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        Self {
            platform,
            bound: None,
            registry: StageRegistry::new(),
        }
    }

    /// A runner bound to `project_id`.
    ///
    /// The workflow is fetched now, so registering an agent for a stage that
    /// is not an agent stage of the project fails immediately.
    pub fn for_project(platform: Rc<dyn Platform>, project_id: &str) -> Result<Self> {
        let bound = fetch_project(platform.as_ref(), parse_project_id(project_id)?)?;
        tracing::debug!(project = %bound.project.id, stages = bound.stages.len(), "bound project");
        Ok(Self {
            platform,
            bound: Some(bound),
            registry: StageRegistry::new(),
        })
    }

    pub fn project(&self) -> Option<&Project> {
        self.bound.as_ref().map(|b| b.project.as_ref())
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Register `f` as the agent of `stage`.
    ///
    /// `params` declares what `f` receives through its [`Args`]. They are
    /// compiled once here; a parameter the runner cannot supply is an error.
    pub fn stage<F>(
        &mut self,
        stage: impl Into<Identifier>,
        params: Vec<Param>,
        f: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&Args) -> anyhow::Result<Routing> + 'static,
    {
        self.register(StageSpec::new(stage), params, f)
    }

    /// Register `f` with explicit [`StageSpec`] options.
    pub fn register<F>(&mut self, spec: StageSpec, params: Vec<Param>, f: F) -> Result<&mut Self>
    where
        F: Fn(&Args) -> anyhow::Result<Routing> + 'static,
    {
        let name = spec.name.unwrap_or_else(|| spec.stage.to_string());
        let dependant = Dependant::build(&params)?;
        let resolved = match &self.bound {
            Some(bound) => Some(match_stage(&spec.stage, &name, &bound.stages)?.uuid),
            None => None,
        };

        tracing::debug!(
            stage = %spec.stage,
            agent = %name,
            params = dependant.len(),
            "registered stage agent"
        );
        let mut agent = RunnerAgent::new(spec.stage, name, Rc::new(f), dependant);
        if let Some(uuid) = resolved {
            agent = agent.resolved_to(uuid);
        }
        self.registry.register(agent, spec.overwrite)?;
        Ok(self)
    }

    /// Run the registered agents with `options`.
    ///
    /// In polling mode this only returns on a startup error.
    pub fn execute(&self, options: &RunOptions) -> Result<RunReport> {
        self.execute_with(options, |wait| {
            if !wait.is_zero() {
                thread::sleep(wait);
            }
            ControlFlow::Continue(())
        })
    }

    /// Like [`Runner::execute`], with `between` deciding what happens
    /// between two polling sweeps instead of sleeping.
    pub fn execute_with<F>(&self, options: &RunOptions, between: F) -> Result<RunReport>
    where
        F: FnMut(Duration) -> ControlFlow<()>,
    {
        let settings = options.validate()?;

        let fetched;
        let bound = match (settings.project_id, &self.bound) {
            (Some(id), Some(bound)) if bound.project.id == id => bound,
            (Some(id), _) => {
                fetched = fetch_project(self.platform.as_ref(), id)?;
                &fetched
            }
            (None, Some(bound)) => bound,
            (None, None) => return Err(RunnerError::MissingProject),
        };

        let stages = self.registry.validate(&bound.stages)?;
        if stages.is_empty() {
            tracing::warn!(project = %bound.project.id, "no stage agents registered");
        }

        let events = settings
            .events_path
            .as_ref()
            .map(EventLog::open)
            .transpose()?;

        tracing::info!(
            project = %bound.project.id,
            stages = stages.len(),
            batch_size = settings.batch_size,
            max_attempts = settings.max_attempts,
            polling = settings.polling_interval.is_some(),
            "starting run"
        );

        let task_loop = TaskLoop::new(
            Rc::clone(&self.platform),
            Rc::clone(&bound.project),
            stages,
            &settings,
            events,
        );
        Ok(task_loop.run(between))
    }

    /// Parse the command line, run, and turn the outcome into an exit code.
    pub fn run(self) -> ExitCode {
        self.run_with_args(RunArgs::parse_args())
    }

    pub fn run_with_args(self, args: RunArgs) -> ExitCode {
        match self.run_inner(&args) {
            Ok(report) => {
                tracing::info!(
                    sweeps = report.sweeps,
                    processed = report.processed,
                    routed = report.routed,
                    abandoned = report.abandoned,
                    "run finished"
                );
                ExitCode::from(exit_codes::SUCCESS as u8)
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                ExitCode::from(err.exit_code() as u8)
            }
        }
    }

    fn run_inner(&self, args: &RunArgs) -> Result<RunReport> {
        let options = match &args.config {
            Some(path) => RunOptions::load(path)?,
            None => RunOptions::default(),
        };
        let options = args.apply(options);
        init_logging(&options.log_level, options.log_format)?;
        self.execute(&options)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("project", &self.project().map(|p| p.id))
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn fetch_project(platform: &dyn Platform, project_id: Uuid) -> Result<BoundProject> {
    let project = platform.project(project_id)?;
    let stages = platform.workflow_stages(&project)?;
    Ok(BoundProject {
        project: Rc::new(project),
        stages,
    })
}
