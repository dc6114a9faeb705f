//! Outcome of a run, per task and per sweep.

use crate::platform::Identifier;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Why a task was given up on in this sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// Every attempt failed with a retryable error.
    AttemptsExhausted,
    /// The agent's parameters could not be resolved.
    Resolution,
    /// The agent routed to a pathway the task's stage does not have.
    InvalidPathway,
    /// The bundle holding the task's routing decision was rejected.
    SubmissionFailed,
    /// The platform returned no label row for the task's data unit.
    MissingLabelRow,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::AttemptsExhausted => write!(f, "attempts exhausted"),
            AbandonReason::Resolution => write!(f, "dependency resolution failed"),
            AbandonReason::InvalidPathway => write!(f, "invalid pathway"),
            AbandonReason::SubmissionFailed => write!(f, "submission failed"),
            AbandonReason::MissingLabelRow => write!(f, "missing label row"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ItemOutcome {
    /// Submitted along this pathway.
    Routed { pathway: Identifier },
    /// The agent left the task where it was.
    NoDecision,
    Abandoned { reason: AbandonReason },
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub stage: Identifier,
    pub task: Uuid,
    pub data_title: String,
    /// Agent invocations made, including the successful one.
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn is_routed(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Routed { .. })
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Abandoned { .. })
    }
}

/// One pass over every registered stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// 1-based sweep number within the run.
    pub sweep: u64,
    pub items: Vec<ItemReport>,
    /// Stages skipped because the platform failed to list or hydrate them.
    pub skipped_stages: Vec<Identifier>,
}

impl SweepReport {
    pub fn routed(&self) -> usize {
        self.items.iter().filter(|i| i.is_routed()).count()
    }

    pub fn no_decision(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.outcome == ItemOutcome::NoDecision)
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.items.iter().filter(|i| i.is_abandoned()).count()
    }
}

/// Result of [`crate::runner::Runner::execute`].
///
/// Totals cover the whole run. Only the latest sweep is kept in full, so a
/// long-running polling run does not accumulate item reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sweeps: u64,
    pub processed: usize,
    pub routed: usize,
    pub no_decision: usize,
    pub abandoned: usize,
    pub last_sweep: SweepReport,
}

impl RunReport {
    pub(crate) fn record(&mut self, sweep: SweepReport) {
        self.sweeps += 1;
        self.processed += sweep.items.len();
        self.routed += sweep.routed();
        self.no_decision += sweep.no_decision();
        self.abandoned += sweep.abandoned();
        self.last_sweep = sweep;
    }

    /// Item reports of the latest sweep.
    pub fn items(&self) -> &[ItemReport] {
        &self.last_sweep.items
    }
}
