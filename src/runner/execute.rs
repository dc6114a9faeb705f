//! The sweep loop: fetch, hydrate, execute and submit.
//!
//! Each sweep visits the registered stages in registration order. A stage's
//! pending tasks are split into batches of at most `batch_size`; every batch
//! costs one label-row listing, one label initialisation and one submission
//! request, however many tasks it holds. Tasks run one at a time.

use super::registry::RunnerAgent;
use super::report::{AbandonReason, ItemOutcome, ItemReport, RunReport, SweepReport};
use crate::config::RunSettings;
use crate::deps::{Context, ResolveError, ScopeStack, solve_dependencies};
use crate::events::{Event, EventAction, EventLog};
use crate::platform::{AgentTask, LabelRow, Platform, PlatformError, Project, WorkflowStage};
use crate::routing::{Routing, RoutingBundle};
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Result of one invocation of a stage agent.
#[derive(Debug)]
enum Attempt {
    Routed(Routing),
    /// The agent or one of its providers failed; another attempt may succeed.
    Retryable(anyhow::Error),
    /// The agent cannot run on this task at all.
    Fatal(ResolveError),
}

pub(crate) struct TaskLoop<'a> {
    platform: Rc<dyn Platform>,
    project: Rc<Project>,
    stages: Vec<(&'a RunnerAgent, WorkflowStage)>,
    settings: &'a RunSettings,
    events: Option<EventLog>,
}

impl<'a> TaskLoop<'a> {
    pub(crate) fn new(
        platform: Rc<dyn Platform>,
        project: Rc<Project>,
        stages: Vec<(&'a RunnerAgent, WorkflowStage)>,
        settings: &'a RunSettings,
        events: Option<EventLog>,
    ) -> Self {
        Self {
            platform,
            project,
            stages,
            settings,
            events,
        }
    }

    /// Sweep once, or keep sweeping while a polling interval is set.
    ///
    /// Between sweeps `between` receives the time left until the next sweep
    /// is due (zero if the last one overran) and decides whether to go on.
    pub(crate) fn run<F>(mut self, mut between: F) -> RunReport
    where
        F: FnMut(Duration) -> ControlFlow<()>,
    {
        let mut report = RunReport::default();

        loop {
            let started = Instant::now();
            let sweep = self.sweep(report.sweeps + 1);
            report.record(sweep);

            let Some(interval) = self.settings.polling_interval else {
                break;
            };
            let wait = interval.saturating_sub(started.elapsed());
            tracing::debug!(wait_ms = wait.as_millis() as u64, "waiting for next sweep");
            if between(wait).is_break() {
                break;
            }
        }

        report
    }

    fn sweep(&mut self, number: u64) -> SweepReport {
        let mut sweep = SweepReport {
            sweep: number,
            ..SweepReport::default()
        };
        self.record(Event::new(EventAction::SweepStart).with_details(json!({
            "sweep": number,
            "project": self.project.id,
        })));

        let stages = self.stages.clone();
        for (agent, stage) in stages {
            if let Err(e) = self.run_stage(agent, &stage, &mut sweep) {
                tracing::error!(
                    stage = %agent.stage,
                    "skipping stage `{}` for this sweep: {}",
                    stage.title,
                    e
                );
                sweep.skipped_stages.push(agent.stage.clone());
            }
        }

        tracing::info!(
            sweep = number,
            routed = sweep.routed(),
            no_decision = sweep.no_decision(),
            abandoned = sweep.abandoned(),
            "sweep complete"
        );
        self.record(Event::new(EventAction::SweepComplete).with_details(json!({
            "sweep": number,
            "processed": sweep.items.len(),
            "routed": sweep.routed(),
            "abandoned": sweep.abandoned(),
        })));
        sweep
    }

    fn run_stage(
        &mut self,
        agent: &RunnerAgent,
        stage: &WorkflowStage,
        sweep: &mut SweepReport,
    ) -> Result<(), PlatformError> {
        let mut tasks = self.platform.pending_tasks(&self.project, stage)?;
        if let Some(cap) = self.settings.max_tasks_per_stage {
            tasks.truncate(cap);
        }

        let total = tasks.len();
        if total == 0 {
            tracing::debug!(stage = %agent.stage, "no pending tasks");
            return Ok(());
        }
        tracing::info!(stage = %agent.stage, agent = %agent.name, total, "processing stage");

        let mut processed = 0;
        for batch in tasks.chunks(self.settings.batch_size) {
            let rows = self.hydrate(batch)?;

            let mut bundle = RoutingBundle::new();
            let mut items = Vec::with_capacity(batch.len());
            for (task, row) in batch.iter().zip(rows) {
                let item = match row {
                    Some(row) => self.execute_item(agent, task, row, &mut bundle),
                    None => {
                        tracing::error!(
                            stage = %agent.stage,
                            task = %task.uuid,
                            "no label row for data unit {}",
                            task.data_id
                        );
                        self.abandon(agent, task, 0, AbandonReason::MissingLabelRow)
                    }
                };
                items.push(item);
            }

            self.flush(agent, bundle, &mut items);
            processed += items.len();
            sweep.items.extend(items);
            tracing::info!(stage = %agent.stage, "{}/{} tasks processed", processed, total);
        }

        Ok(())
    }

    /// Fetch and initialise the label rows of `batch`, aligned with it.
    fn hydrate(&self, batch: &[AgentTask]) -> Result<Vec<Option<Rc<LabelRow>>>, PlatformError> {
        let data_ids: Vec<Uuid> = batch.iter().map(|t| t.data_id).collect();
        let mut listed: HashMap<Uuid, LabelRow> = self
            .platform
            .label_rows(&self.project, &data_ids)?
            .into_iter()
            .map(|row| (row.data_id, row))
            .collect();

        let mut rows: Vec<LabelRow> = data_ids
            .iter()
            .filter_map(|id| listed.remove(id))
            .collect();
        if !rows.is_empty() {
            self.platform.initialise_labels(&self.project, &mut rows)?;
        }

        let rows: HashMap<Uuid, Rc<LabelRow>> = rows
            .into_iter()
            .map(|row| (row.data_id, Rc::new(row)))
            .collect();
        Ok(data_ids.iter().map(|id| rows.get(id).cloned()).collect())
    }

    fn execute_item(
        &mut self,
        agent: &RunnerAgent,
        task: &AgentTask,
        row: Rc<LabelRow>,
        bundle: &mut RoutingBundle,
    ) -> ItemReport {
        let context = Context::new(Rc::clone(&self.platform))
            .with_project(Rc::clone(&self.project))
            .with_task(Rc::new(task.clone()))
            .with_label_row(row);
        let max_attempts = self.settings.max_attempts;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt(agent, &context) {
                Attempt::Routed(routing) => return self.route(agent, task, attempts, routing, bundle),
                Attempt::Retryable(err) => {
                    tracing::warn!(
                        stage = %agent.stage,
                        task = %task.uuid,
                        attempt = attempts,
                        "[attempt {}/{}] agent `{}` failed: {:?}",
                        attempts,
                        max_attempts,
                        agent.name,
                        err
                    );
                    self.record(
                        Event::new(EventAction::AttemptFailed)
                            .with_stage(&agent.stage)
                            .with_task(task.uuid)
                            .with_details(json!({
                                "attempt": attempts,
                                "max_attempts": max_attempts,
                                "error": format!("{:#}", err),
                            })),
                    );
                    if attempts >= max_attempts {
                        tracing::error!(
                            stage = %agent.stage,
                            task = %task.uuid,
                            "giving up on task after {} attempts",
                            attempts
                        );
                        let reason = AbandonReason::AttemptsExhausted;
                        return self.abandon(agent, task, attempts, reason);
                    }
                }
                Attempt::Fatal(err) => {
                    tracing::error!(
                        stage = %agent.stage,
                        task = %task.uuid,
                        "cannot run agent `{}`: {}",
                        agent.name,
                        err
                    );
                    return self.abandon(agent, task, attempts, AbandonReason::Resolution);
                }
            }
        }
    }

    fn route(
        &mut self,
        agent: &RunnerAgent,
        task: &AgentTask,
        attempts: u32,
        routing: Routing,
        bundle: &mut RoutingBundle,
    ) -> ItemReport {
        let pathway = match routing {
            Routing::NoDecision => {
                tracing::debug!(stage = %agent.stage, task = %task.uuid, "no routing decision");
                self.record(
                    Event::new(EventAction::NoDecision)
                        .with_stage(&agent.stage)
                        .with_task(task.uuid),
                );
                return report(agent, task, attempts, ItemOutcome::NoDecision);
            }
            Routing::Pathway(pathway) => pathway,
        };

        if let Err(e) = bundle.proceed(task, &pathway) {
            tracing::error!(stage = %agent.stage, task = %task.uuid, "{}", e);
            return self.abandon(agent, task, attempts, AbandonReason::InvalidPathway);
        }

        tracing::debug!(stage = %agent.stage, task = %task.uuid, pathway = %pathway, "routed task");
        self.record(
            Event::new(EventAction::Routed)
                .with_stage(&agent.stage)
                .with_task(task.uuid)
                .with_details(json!({ "pathway": pathway.to_string(), "attempts": attempts })),
        );
        report(agent, task, attempts, ItemOutcome::Routed { pathway })
    }

    /// Submit the batch's routing decisions. On failure, every task routed in
    /// this batch is reported abandoned.
    fn flush(&mut self, agent: &RunnerAgent, bundle: RoutingBundle, items: &mut [ItemReport]) {
        let queued = bundle.len();
        match bundle.flush(self.platform.as_ref(), &self.project) {
            Ok(0) => {}
            Ok(sent) => {
                tracing::debug!(stage = %agent.stage, sent, "submitted routing bundle");
                self.record(
                    Event::new(EventAction::BundleFlushed)
                        .with_stage(&agent.stage)
                        .with_details(json!({ "submissions": sent })),
                );
            }
            Err(e) => {
                tracing::error!(
                    stage = %agent.stage,
                    "failed to submit {} routing decisions: {}",
                    queued,
                    e
                );
                for item in items.iter_mut().filter(|i| i.is_routed()) {
                    item.outcome = ItemOutcome::Abandoned {
                        reason: AbandonReason::SubmissionFailed,
                    };
                    self.record(
                        Event::new(EventAction::Abandoned)
                            .with_stage(&agent.stage)
                            .with_task(item.task)
                            .with_details(json!({ "reason": AbandonReason::SubmissionFailed })),
                    );
                }
            }
        }
    }

    fn abandon(
        &mut self,
        agent: &RunnerAgent,
        task: &AgentTask,
        attempts: u32,
        reason: AbandonReason,
    ) -> ItemReport {
        self.record(
            Event::new(EventAction::Abandoned)
                .with_stage(&agent.stage)
                .with_task(task.uuid)
                .with_details(json!({ "reason": reason, "attempts": attempts })),
        );
        report(agent, task, attempts, ItemOutcome::Abandoned { reason })
    }

    fn record(&mut self, event: Event) {
        if let Some(log) = self.events.as_mut() {
            if let Err(e) = log.append(&event) {
                tracing::warn!("failed to record {} event: {}", event.action, e);
            }
        }
    }
}

/// Resolve the agent's parameters and call it once.
///
/// Scoped resources acquired on the way are released before returning, also
/// when resolution fails or the agent panics.
fn attempt(agent: &RunnerAgent, context: &Context) -> Attempt {
    let mut scope = ScopeStack::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let args = match solve_dependencies(context, &agent.dependant, &mut scope) {
            Ok(args) => args,
            Err(e) if e.is_retryable() => return Attempt::Retryable(e.into()),
            Err(e) => return Attempt::Fatal(e),
        };
        match (agent.callable)(&args) {
            Ok(routing) => Attempt::Routed(routing),
            Err(e) => Attempt::Retryable(e),
        }
    }));

    scope.close();
    outcome.unwrap_or_else(|payload| {
        Attempt::Retryable(anyhow::anyhow!("agent panicked: {}", panic_message(&*payload)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

fn report(
    agent: &RunnerAgent,
    task: &AgentTask,
    attempts: u32,
    outcome: ItemOutcome,
) -> ItemReport {
    ItemReport {
        stage: agent.stage.clone(),
        task: task.uuid,
        data_title: task.data_title.clone(),
        attempts,
        outcome,
    }
}
