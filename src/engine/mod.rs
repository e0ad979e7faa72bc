// src/engine/mod.rs

//! Orchestration engine for suitedag.
//!
//! The scheduler (`dag::Scheduler`) decides what happens on each tick; the
//! async shell in [`runtime`] drives the ticks on a fixed interval, publishes
//! every transition to the result ledger and handles Ctrl-C.

use std::fmt;
use std::time::Duration;

use crate::dag::{Scheduler, TestcaseState};
use crate::exec::Executor;
use crate::types::{TestOutcome, TestcaseStatus};

pub mod runtime;

pub use runtime::Runtime;

/// Runtime options for the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Time between scheduler ticks.
    pub poll_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
        }
    }
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Testcases that never finished: cancelled while running, or still
    /// queued when the run stopped.
    pub incomplete: usize,
    /// The run was stopped before every testcase finished.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn from_scheduler<E: Executor>(scheduler: &Scheduler<E>, cancelled: bool) -> Self {
        let mut summary = RunSummary {
            total: scheduler.tree().len(),
            cancelled,
            ..RunSummary::default()
        };

        for state in scheduler.states() {
            match classify(state) {
                Classified::Passed => summary.passed += 1,
                Classified::Failed => summary.failed += 1,
                Classified::Skipped => summary.skipped += 1,
                Classified::Incomplete => summary.incomplete += 1,
            }
        }

        summary
    }

    /// Every testcase ran and none failed or was skipped.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.passed == self.total
    }

    /// Process exit code for this run.
    ///
    /// `no_exit` only masks failures of a run that completed; a cancelled run
    /// always exits non-zero.
    pub fn exit_code(&self, no_exit: bool) -> i32 {
        if self.cancelled || (!self.is_success() && !no_exit) {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} testcases: {} passed, {} failed, {} skipped, {} incomplete",
            self.total, self.passed, self.failed, self.skipped, self.incomplete
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

enum Classified {
    Passed,
    Failed,
    Skipped,
    Incomplete,
}

fn classify<H>(state: &TestcaseState<H>) -> Classified {
    match (state.status(), state.exit_outcome.as_ref().map(|o| o.outcome)) {
        (TestcaseStatus::Skipped, _) => Classified::Skipped,
        (TestcaseStatus::Done, Some(TestOutcome::Incomplete)) => Classified::Incomplete,
        (TestcaseStatus::Done, Some(o)) if o.is_failing() => Classified::Failed,
        (TestcaseStatus::Done, Some(_)) => Classified::Passed,
        _ => Classified::Incomplete,
    }
}
