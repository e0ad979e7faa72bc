// src/dag/state.rs

//! Live per-testcase state owned by the scheduler.

use std::time::Instant;

use tracing::{error, trace};

use crate::dag::entry::TestcaseId;
use crate::types::{ExitOutcome, TestcaseStatus};

/// Mutable run state for one testcase.
///
/// `handle` is only ever `Some` while the testcase is `Running`.
#[derive(Debug)]
pub struct TestcaseState<H> {
    pub id: TestcaseId,
    status: TestcaseStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub handle: Option<H>,
    pub exit_outcome: Option<ExitOutcome>,
}

impl<H> TestcaseState<H> {
    pub fn new(id: TestcaseId) -> Self {
        Self {
            id,
            status: TestcaseStatus::Queued,
            started_at: None,
            finished_at: None,
            handle: None,
            exit_outcome: None,
        }
    }

    pub fn status(&self) -> TestcaseStatus {
        self.status
    }

    /// Move to `next`, refusing anything that would regress the lifecycle.
    ///
    /// Returns whether the transition happened.
    pub fn transition(&mut self, next: TestcaseStatus) -> bool {
        if !self.status.can_transition_to(next) {
            error!(
                testcase = %self.id,
                from = %self.status,
                to = %next,
                "refusing illegal status transition"
            );
            return false;
        }

        trace!(testcase = %self.id, from = %self.status, to = %next, "status transition");
        self.status = next;
        true
    }

    /// Whether this testcase finished in a way that lets dependents run.
    pub fn succeeded(&self) -> bool {
        self.status == TestcaseStatus::Done
            && self
                .exit_outcome
                .as_ref()
                .is_some_and(|o| !o.is_failing())
    }

    /// Whether dependents of this testcase must be skipped.
    pub fn blocks_dependents(&self) -> bool {
        match self.status {
            TestcaseStatus::Skipped => true,
            TestcaseStatus::Done => !self.succeeded(),
            _ => false,
        }
    }
}
