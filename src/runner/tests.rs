//! Tests for registration and the sweep loop.

use super::*;
use crate::deps::{Provider, Scoped, ScopedProvider};
use crate::events::{Event, EventAction};
use crate::platform::{
    AgentTask, LabelRow, MemoryPlatform, PlatformCall, PlatformError, StageType, Submission,
};
use crate::test_support::{AGENT_STAGE, Workflow};
use std::cell::Cell;
use tempfile::TempDir;

fn options() -> RunOptions {
    RunOptions::default()
}

fn route_complete(_: &Args) -> anyhow::Result<Routing> {
    Ok(Routing::to("complete"))
}

/// Agent that fails until it has been called `succeed_on` times.
fn flaky_agent(
    calls: &Rc<Cell<u32>>,
    succeed_on: u32,
) -> impl Fn(&Args) -> anyhow::Result<Routing> + use<> {
    let calls = Rc::clone(calls);
    move |_: &Args| {
        calls.set(calls.get() + 1);
        if calls.get() < succeed_on {
            anyhow::bail!("transient failure #{}", calls.get());
        }
        Ok(Routing::to("complete"))
    }
}

fn pending_task_calls(platform: &MemoryPlatform) -> Vec<Uuid> {
    platform
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            PlatformCall::PendingTasks { stage } => Some(stage),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_duplicate_stage_without_overwrite_fails() {
    let workflow = Workflow::new();
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let err = runner
        .stage(AGENT_STAGE, vec![], |_: &Args| Ok(Routing::NoDecision))
        .unwrap_err();

    assert!(matches!(err, RunnerError::DuplicateStage(_)));
    assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    assert_eq!(runner.registry().len(), 1);
}

#[test]
fn test_overwrite_replaces_registered_agent() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();
    runner
        .register(
            StageSpec::new(AGENT_STAGE).named("reviewer").overwrite(true),
            vec![],
            |_: &Args| Ok(Routing::to("review")),
        )
        .unwrap();

    runner.execute(&options()).unwrap();

    assert_eq!(runner.registry().len(), 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.review_stage));
}

#[test]
fn test_bound_runner_checks_stage_at_registration() {
    let workflow = Workflow::new();
    let mut runner = workflow.runner();

    let err = runner
        .stage("Agent 7", vec![], route_complete)
        .unwrap_err();
    assert!(matches!(err, RunnerError::UnknownStage { .. }));
    assert!(err.to_string().contains("`Agent 1`"));

    let err = runner.stage("Review", vec![], route_complete).unwrap_err();
    assert!(matches!(err, RunnerError::WrongStageType { .. }));

    // By UUID works as well as by title.
    runner
        .stage(workflow.agent_stage, vec![], route_complete)
        .unwrap();
}

#[test]
fn test_unbound_runner_checks_stages_at_run() {
    let workflow = Workflow::new();
    workflow.add_tasks(2);
    let mut runner = Runner::new(workflow.platform());
    runner.stage("Agent 7", vec![], route_complete).unwrap();

    let err = runner
        .execute(&RunOptions {
            project_id: Some(workflow.project.to_string()),
            ..options()
        })
        .unwrap_err();

    assert!(matches!(err, RunnerError::UnknownStage { .. }));
    assert!(pending_task_calls(&workflow.platform).is_empty());
}

/// Agent counting its calls and routing every task along `pathway`.
fn counting_agent(
    calls: &Rc<Cell<u32>>,
    pathway: &'static str,
) -> impl Fn(&Args) -> anyhow::Result<Routing> + use<> {
    let calls = Rc::clone(calls);
    move |_: &Args| {
        calls.set(calls.get() + 1);
        Ok(Routing::to(pathway))
    }
}

#[test]
fn test_stage_title_and_uuid_are_the_same_stage() {
    let workflow = Workflow::new();
    workflow.add_tasks(1);
    let calls = Rc::new(Cell::new(0));
    let mut runner = workflow.runner();
    runner
        .stage(AGENT_STAGE, vec![], counting_agent(&calls, "complete"))
        .unwrap();

    let err = runner
        .stage(workflow.agent_stage, vec![], counting_agent(&calls, "complete"))
        .unwrap_err();
    assert!(matches!(err, RunnerError::DuplicateStage(_)));
    assert_eq!(runner.registry().len(), 1);

    let report = runner.execute(&options()).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(report.items().len(), 1);
}

#[test]
fn test_overwrite_by_uuid_replaces_agent_registered_by_title() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();
    runner
        .register(
            StageSpec::new(workflow.agent_stage).overwrite(true),
            vec![],
            |_: &Args| Ok(Routing::to("review")),
        )
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(runner.registry().len(), 1);
    assert_eq!(report.items().len(), 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.review_stage));
}

#[test]
fn test_unbound_stage_aliases_fail_before_fetching() {
    let workflow = Workflow::new();
    workflow.add_tasks(1);
    let calls = Rc::new(Cell::new(0));
    let mut runner = Runner::new(workflow.platform());
    runner
        .stage(AGENT_STAGE, vec![], counting_agent(&calls, "complete"))
        .unwrap();
    runner
        .stage(workflow.agent_stage, vec![], counting_agent(&calls, "complete"))
        .unwrap();

    let err = runner
        .execute(&RunOptions {
            project_id: Some(workflow.project.to_string()),
            ..options()
        })
        .unwrap_err();

    assert!(matches!(err, RunnerError::DuplicateStage(_)));
    assert_eq!(calls.get(), 0);
    assert!(pending_task_calls(&workflow.platform).is_empty());
}

#[test]
fn test_unbound_stage_alias_with_overwrite_runs_once() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let mut runner = Runner::new(workflow.platform());
    runner
        .stage(AGENT_STAGE, vec![], counting_agent(&first, "complete"))
        .unwrap();
    runner
        .register(
            StageSpec::new(workflow.agent_stage).overwrite(true),
            vec![],
            counting_agent(&second, "review"),
        )
        .unwrap();

    let report = runner
        .execute(&RunOptions {
            project_id: Some(workflow.project.to_string()),
            ..options()
        })
        .unwrap();

    assert_eq!((first.get(), second.get()), (0, 1));
    assert_eq!(report.items().len(), 1);
    assert_eq!(pending_task_calls(&workflow.platform).len(), 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.review_stage));
}

#[test]
fn test_unmappable_parameter_fails_registration() {
    let workflow = Workflow::new();
    let mut runner = workflow.runner();

    let err = runner
        .stage(AGENT_STAGE, vec![Param::of::<String>("title")], route_complete)
        .unwrap_err();

    assert!(matches!(err, RunnerError::Dependency(_)));
    assert!(runner.registry().is_empty());
}

#[test]
fn test_duplicate_parameter_name_fails_registration() {
    let workflow = Workflow::new();
    let mut runner = workflow.runner();

    let err = runner
        .stage(
            AGENT_STAGE,
            vec![
                Param::of::<LabelRow>("label_row"),
                Param::of::<AgentTask>("label_row"),
            ],
            route_complete,
        )
        .unwrap_err();

    assert!(matches!(err, RunnerError::Dependency(_)));
    assert!(err.to_string().contains("more than once"));
    assert!(runner.registry().is_empty());
}

#[test]
fn test_invalid_project_id_is_rejected() {
    let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new());
    let err = Runner::for_project(platform, "not-a-uuid").err().unwrap();
    assert!(matches!(err, RunnerError::InvalidProjectId(_)));
}

#[test]
fn test_unknown_project_is_a_platform_failure() {
    let platform: Rc<dyn Platform> = Rc::new(MemoryPlatform::new());
    let err = Runner::for_project(platform, &Uuid::new_v4().to_string())
        .err()
        .unwrap();
    assert_eq!(err.exit_code(), exit_codes::PLATFORM_FAILURE);
}

// ============================================================================
// Startup validation
// ============================================================================

#[test]
fn test_missing_project_fails_before_fetching() {
    let workflow = Workflow::new();
    let mut runner = Runner::new(workflow.platform());
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let err = runner.execute(&options()).unwrap_err();

    assert!(matches!(err, RunnerError::MissingProject));
    assert!(workflow.platform.calls().is_empty());
}

#[test]
fn test_project_given_at_run_time() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let mut runner = Runner::new(workflow.platform());
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let report = runner
        .execute(&RunOptions {
            project_id: Some(workflow.project.to_string()),
            ..options()
        })
        .unwrap();

    assert_eq!(report.routed, 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.complete_stage));
}

#[test]
fn test_invalid_options_fail_before_any_fetch() {
    let invalid = [
        RunOptions {
            batch_size: 0,
            ..options()
        },
        RunOptions {
            batch_size: -3,
            ..options()
        },
        RunOptions {
            max_attempts: 0,
            ..options()
        },
        RunOptions {
            max_tasks_per_stage: Some(0),
            ..options()
        },
        RunOptions {
            polling_interval_seconds: Some(-10),
            ..options()
        },
    ];

    for options in invalid {
        let workflow = Workflow::new();
        workflow.add_tasks(3);
        let mut runner = workflow.runner();
        runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

        let err = runner.execute(&options).unwrap_err();

        assert!(matches!(err, RunnerError::Config(_)), "{:?}", options);
        assert!(pending_task_calls(&workflow.platform).is_empty());
        assert!(workflow.platform.label_row_requests().is_empty());
        assert!(workflow.platform.submissions().is_empty());
    }
}

// ============================================================================
// Retry policy
// ============================================================================

#[test]
fn test_transient_failures_are_retried() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let calls = Rc::new(Cell::new(0));
    let mut runner = workflow.runner();
    runner
        .stage(AGENT_STAGE, vec![], flaky_agent(&calls, 3))
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(calls.get(), 3);
    assert_eq!(report.items()[0].attempts, 3);
    assert!(report.items()[0].is_routed());
    assert_eq!(workflow.platform.submissions().len(), 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.complete_stage));
}

#[test]
fn test_always_failing_agent_gives_up_after_max_attempts() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(2);
    let calls = Rc::new(Cell::new(0));
    let mut runner = workflow.runner();
    let counter = Rc::clone(&calls);
    runner
        .stage(AGENT_STAGE, vec![], move |_: &Args| {
            counter.set(counter.get() + 1);
            anyhow::bail!("model unavailable")
        })
        .unwrap();

    let report = runner
        .execute(&RunOptions {
            max_attempts: 4,
            ..options()
        })
        .unwrap();

    assert_eq!(calls.get(), 8);
    assert_eq!(report.abandoned, 2);
    for item in report.items() {
        assert_eq!(item.attempts, 4);
        assert_eq!(
            item.outcome,
            ItemOutcome::Abandoned {
                reason: AbandonReason::AttemptsExhausted
            }
        );
    }
    assert!(workflow.platform.submissions().is_empty());
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.agent_stage));
}

#[test]
fn test_panicking_agent_is_retried() {
    let workflow = Workflow::new();
    workflow.add_tasks(1);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut runner = workflow.runner();
    runner
        .stage(AGENT_STAGE, vec![], move |_: &Args| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                panic!("index out of bounds");
            }
            Ok(Routing::to("complete"))
        })
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(report.items()[0].attempts, 2);
    assert_eq!(report.routed, 1);
}

#[test]
fn test_invalid_pathway_is_not_retried() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(2);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut runner = workflow.runner();
    runner
        .stage(
            AGENT_STAGE,
            vec![Param::of::<LabelRow>("label_row")],
            move |args: &Args| {
                counter.set(counter.get() + 1);
                if args.get::<LabelRow>("label_row")?.data_title == "0.jpg" {
                    Ok(Routing::to("nowhere"))
                } else {
                    Ok(Routing::to("complete"))
                }
            },
        )
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(
        report.items()[0].outcome,
        ItemOutcome::Abandoned {
            reason: AbandonReason::InvalidPathway
        }
    );
    assert_eq!(report.items()[0].attempts, 1);
    // The other task of the batch is still submitted.
    assert_eq!(workflow.platform.submissions().len(), 1);
    assert_eq!(workflow.platform.submissions()[0].len(), 1);
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.agent_stage));
    assert_eq!(workflow.stage_of(tasks[1]), Some(workflow.complete_stage));
}

#[test]
fn test_no_decision_leaves_task_untouched() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(1);
    let mut runner = workflow.runner();
    runner
        .stage(AGENT_STAGE, vec![], |_: &Args| Ok(Routing::NoDecision))
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(report.no_decision, 1);
    assert_eq!(report.items()[0].attempts, 1);
    assert!(workflow.platform.submissions().is_empty());
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.agent_stage));
}

// ============================================================================
// Batching
// ============================================================================

#[test]
fn test_tasks_are_hydrated_and_submitted_per_batch() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(7);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let report = runner
        .execute(&RunOptions {
            batch_size: 3,
            ..options()
        })
        .unwrap();

    let requests = workflow.platform.label_row_requests();
    assert_eq!(
        requests.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![3, 3, 1]
    );
    let data_ids: Vec<Uuid> = tasks
        .iter()
        .map(|t| workflow.platform.data_id_of(workflow.project, *t).unwrap())
        .collect();
    assert_eq!(requests.concat(), data_ids);

    let submissions = workflow.platform.submissions();
    assert_eq!(
        submissions.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![3, 3, 1]
    );
    let submitted: Vec<Uuid> = submissions.concat().iter().map(|s| s.task).collect();
    assert_eq!(submitted, tasks);

    let initialised = workflow
        .platform
        .calls()
        .into_iter()
        .filter(|c| matches!(c, PlatformCall::InitialiseLabels { .. }))
        .count();
    assert_eq!(initialised, 3);

    let reported: Vec<Uuid> = report.items().iter().map(|i| i.task).collect();
    assert_eq!(reported, tasks);
}

#[test]
fn test_agent_receives_initialised_context() {
    let workflow = Workflow::new();
    workflow.add_tasks(2);
    let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);
    let mut runner = workflow.runner();
    runner
        .stage(
            AGENT_STAGE,
            vec![
                Param::of::<AgentTask>("task"),
                Param::of::<LabelRow>("label_row"),
                Param::of::<Project>("project"),
                Param::value("threshold", 0.8_f64),
            ],
            move |args: &Args| {
                let task = args.get::<AgentTask>("task")?;
                let row = args.get::<LabelRow>("label_row")?;
                assert_eq!(task.data_id, row.data_id);
                assert!(row.initialised);
                assert_eq!(args.get::<Project>("project")?.title, "fixture");
                assert_eq!(*args.get::<f64>("threshold")?, 0.8);
                record.borrow_mut().push(row.data_title.clone());
                Ok(Routing::NoDecision)
            },
        )
        .unwrap();

    runner.execute(&options()).unwrap();

    assert_eq!(*seen.borrow(), vec!["0.jpg", "1.jpg"]);
}

#[test]
fn test_max_tasks_per_stage_caps_each_sweep() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(5);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let report = runner
        .execute(&RunOptions {
            max_tasks_per_stage: Some(2),
            ..options()
        })
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(workflow.stage_of(tasks[1]), Some(workflow.complete_stage));
    assert_eq!(workflow.stage_of(tasks[2]), Some(workflow.agent_stage));
}

#[test]
fn test_failed_bundle_abandons_its_routed_tasks() {
    let workflow = Workflow::new();
    let tasks = workflow.add_tasks(2);
    workflow.platform.fail_submissions(true);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(report.routed, 0);
    assert_eq!(report.abandoned, 2);
    assert!(report.items().iter().all(|i| i.outcome
        == ItemOutcome::Abandoned {
            reason: AbandonReason::SubmissionFailed
        }));
    assert_eq!(workflow.stage_of(tasks[0]), Some(workflow.agent_stage));
}

// ============================================================================
// Scoped resources
// ============================================================================

#[test]
fn test_scoped_resource_released_once_per_attempt() {
    let workflow = Workflow::new();
    workflow.add_tasks(2);
    let acquired = Rc::new(Cell::new(0));
    let released = Rc::new(Cell::new(0));
    let (a, r) = (Rc::clone(&acquired), Rc::clone(&released));
    let session = ScopedProvider::new("session", vec![], move |_: &Args| {
        a.set(a.get() + 1);
        let r = Rc::clone(&r);
        Ok(Scoped::new("session").on_release(move || {
            r.set(r.get() + 1);
            Ok(())
        }))
    });
    let mut runner = workflow.runner();
    runner
        .stage(
            AGENT_STAGE,
            vec![Param::scoped("session", &session)],
            |_: &Args| anyhow::bail!("agent crashed"),
        )
        .unwrap();

    runner
        .execute(&RunOptions {
            max_attempts: 2,
            ..options()
        })
        .unwrap();

    assert_eq!(acquired.get(), 4);
    assert_eq!(released.get(), 4);
}

#[test]
fn test_failing_provider_is_retried() {
    let workflow = Workflow::new();
    workflow.add_tasks(1);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let lookup = Provider::new("lookup", vec![], move |_: &Args| {
        counter.set(counter.get() + 1);
        if counter.get() < 2 {
            anyhow::bail!("timeout");
        }
        Ok("priority".to_string())
    });
    let mut runner = workflow.runner();
    runner
        .stage(
            AGENT_STAGE,
            vec![Param::depends("lookup", &lookup)],
            route_complete,
        )
        .unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(report.items()[0].attempts, 2);
    assert_eq!(report.routed, 1);
}

// ============================================================================
// Sweeps
// ============================================================================

#[test]
fn test_stages_run_in_registration_order() {
    let workflow = Workflow::new();
    let second = workflow
        .platform
        .add_stage(workflow.project, "Agent 2", StageType::Agent)
        .unwrap();
    let mut runner = workflow.runner();
    runner.stage("Agent 2", vec![], route_complete).unwrap();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    runner.execute(&options()).unwrap();

    assert_eq!(
        pending_task_calls(&workflow.platform),
        vec![second, workflow.agent_stage]
    );
}

#[test]
fn test_polling_sweeps_until_stopped() {
    let workflow = Workflow::new();
    workflow.add_tasks(1);
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let mut waits = Vec::new();
    let report = runner
        .execute_with(
            &RunOptions {
                polling_interval_seconds: Some(60),
                ..options()
            },
            |wait| {
                waits.push(wait);
                if waits.len() == 1 {
                    workflow.add_tasks(2);
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            },
        )
        .unwrap();

    assert_eq!(report.sweeps, 2);
    assert_eq!(report.routed, 3);
    assert_eq!(report.items().len(), 2);
    assert_eq!(report.last_sweep.sweep, 2);
    assert!(waits.iter().all(|w| *w <= Duration::from_secs(60)));
    assert!(waits[0] > Duration::from_secs(50));
}

#[test]
fn test_single_pass_never_waits() {
    let workflow = Workflow::new();
    let mut runner = workflow.runner();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();

    let report = runner
        .execute_with(
            &RunOptions {
                polling_interval_seconds: Some(0),
                ..options()
            },
            |_| panic!("single pass must not wait"),
        )
        .unwrap();

    assert_eq!(report.sweeps, 1);
    assert_eq!(report.processed, 0);
}

/// Delegates to a [`MemoryPlatform`] but fails to list the tasks of one stage.
struct BrokenStage {
    inner: Rc<MemoryPlatform>,
    stage: Uuid,
}

impl Platform for BrokenStage {
    fn project(&self, project_id: Uuid) -> std::result::Result<Project, PlatformError> {
        self.inner.project(project_id)
    }

    fn workflow_stages(&self, project: &Project) -> std::result::Result<Vec<WorkflowStage>, PlatformError> {
        self.inner.workflow_stages(project)
    }

    fn pending_tasks(
        &self,
        project: &Project,
        stage: &WorkflowStage,
    ) -> std::result::Result<Vec<AgentTask>, PlatformError> {
        if stage.uuid == self.stage {
            return Err(PlatformError::Request("502 Bad Gateway".to_string()));
        }
        self.inner.pending_tasks(project, stage)
    }

    fn label_rows(
        &self,
        project: &Project,
        data_ids: &[Uuid],
    ) -> std::result::Result<Vec<LabelRow>, PlatformError> {
        self.inner.label_rows(project, data_ids)
    }

    fn initialise_labels(
        &self,
        project: &Project,
        rows: &mut [LabelRow],
    ) -> std::result::Result<(), PlatformError> {
        self.inner.initialise_labels(project, rows)
    }

    fn submit(&self, project: &Project, submissions: &[Submission]) -> std::result::Result<(), PlatformError> {
        self.inner.submit(project, submissions)
    }

    fn download_asset(&self, project: &Project, row: &LabelRow) -> std::result::Result<Vec<u8>, PlatformError> {
        self.inner.download_asset(project, row)
    }

    fn label_rows_by_title(
        &self,
        project: &Project,
        data_title: &str,
    ) -> std::result::Result<Vec<LabelRow>, PlatformError> {
        self.inner.label_rows_by_title(project, data_title)
    }
}

#[test]
fn test_failing_stage_is_skipped() {
    let workflow = Workflow::new();
    let second = workflow
        .platform
        .add_stage(workflow.project, "Agent 2", StageType::Agent)
        .unwrap();
    workflow
        .platform
        .add_pathway(workflow.project, second, "complete", Some(workflow.complete_stage))
        .unwrap();
    let task = workflow
        .platform
        .add_task(workflow.project, second, "other.jpg")
        .unwrap();
    workflow.add_tasks(1);

    let platform = Rc::new(BrokenStage {
        inner: Rc::clone(&workflow.platform),
        stage: workflow.agent_stage,
    });
    let mut runner = Runner::for_project(platform, &workflow.project.to_string()).unwrap();
    runner.stage(AGENT_STAGE, vec![], route_complete).unwrap();
    runner.stage("Agent 2", vec![], route_complete).unwrap();

    let report = runner.execute(&options()).unwrap();

    assert_eq!(report.last_sweep.skipped_stages, vec![Identifier::from(AGENT_STAGE)]);
    assert_eq!(report.routed, 1);
    assert_eq!(workflow.stage_of(task), Some(workflow.complete_stage));
}

#[test]
fn test_events_are_recorded_when_configured() {
    let workflow = Workflow::new();
    workflow.add_tasks(2);
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.ndjson");
    let mut runner = workflow.runner();
    runner
        .stage(
            AGENT_STAGE,
            vec![Param::of::<LabelRow>("label_row")],
            |args: &Args| {
                if args.get::<LabelRow>("label_row")?.data_title == "0.jpg" {
                    Ok(Routing::to("complete"))
                } else {
                    Ok(Routing::NoDecision)
                }
            },
        )
        .unwrap();

    runner
        .execute(&RunOptions {
            events_path: Some(path.clone()),
            ..options()
        })
        .unwrap();

    let actions: Vec<EventAction> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str::<Event>(line).unwrap().action)
        .collect();
    assert_eq!(
        actions,
        vec![
            EventAction::SweepStart,
            EventAction::Routed,
            EventAction::NoDecision,
            EventAction::BundleFlushed,
            EventAction::SweepComplete,
        ]
    );
}
