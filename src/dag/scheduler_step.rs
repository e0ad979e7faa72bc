// src/dag/scheduler_step.rs

//! Result types for scheduler ticks.

use std::fmt;
use std::time::Duration;

use crate::dag::entry::TestcaseId;
use crate::types::ExitOutcome;

/// A testcase that reached `Done` during a tick.
#[derive(Debug, Clone)]
pub struct FinishedTestcase {
    pub id: TestcaseId,
    pub outcome: ExitOutcome,
    /// Wall-clock time between start and finish.
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

/// Structured result of a single scheduler tick.
///
/// The runtime publishes these transitions to the ledger; tests use them to
/// assert what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Testcases whose process finished (or was killed) in this tick.
    pub finished: Vec<FinishedTestcase>,
    /// Testcases newly skipped because a dependency did not succeed.
    pub skipped: Vec<(TestcaseId, ExitOutcome)>,
    /// Testcases started in this tick, in admission order.
    pub started: Vec<TestcaseId>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.finished.is_empty() && self.skipped.is_empty() && self.started.is_empty()
    }
}

/// Number of testcases in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub prepared: usize,
    pub running: usize,
    pub done: usize,
    pub skipped: usize,
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queued: {}, running: {}, done: {}, skipped: {}",
            self.queued + self.prepared,
            self.running,
            self.done,
            self.skipped
        )
    }
}
