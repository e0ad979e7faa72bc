// src/types.rs

//! Shared enums for testcase lifecycle, outcomes and configuration knobs.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a testcase within one run.
///
/// The normal path is `Queued -> Prepared -> Running -> Done`. A testcase
/// whose dependency did not succeed diverts from `Queued` straight to
/// `Skipped` and is never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestcaseStatus {
    Queued,
    Prepared,
    Running,
    Done,
    Skipped,
}

impl TestcaseStatus {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    pub fn can_transition_to(self, next: TestcaseStatus) -> bool {
        use TestcaseStatus::*;
        matches!(
            (self, next),
            (Queued, Prepared) | (Prepared, Running) | (Running, Done) | (Queued, Skipped)
        )
    }

    /// `Done` and `Skipped` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, TestcaseStatus::Done | TestcaseStatus::Skipped)
    }
}

impl fmt::Display for TestcaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestcaseStatus::Queued => "queued",
            TestcaseStatus::Prepared => "prepared",
            TestcaseStatus::Running => "running",
            TestcaseStatus::Done => "done",
            TestcaseStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of a finished (or never started) testcase or individual test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Broken,
    Skipped,
    Incomplete,
}

impl TestOutcome {
    /// Failing outcomes make dependents skip and fail the run.
    pub fn is_failing(self) -> bool {
        matches!(self, TestOutcome::Failed | TestOutcome::Broken)
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestOutcome::Passed => "passed",
            TestOutcome::Failed => "failed",
            TestOutcome::Broken => "broken",
            TestOutcome::Skipped => "skipped",
            TestOutcome::Incomplete => "incomplete",
        };
        f.write_str(s)
    }
}

impl FromStr for TestOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passed" => Ok(TestOutcome::Passed),
            "failed" => Ok(TestOutcome::Failed),
            "broken" => Ok(TestOutcome::Broken),
            "skipped" => Ok(TestOutcome::Skipped),
            "incomplete" => Ok(TestOutcome::Incomplete),
            other => Err(format!(
                "invalid outcome: {other} (expected passed, failed, broken, skipped or incomplete)"
            )),
        }
    }
}

/// Outcome plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    pub outcome: TestOutcome,
    pub message: Option<String>,
}

impl ExitOutcome {
    pub fn new(outcome: TestOutcome) -> Self {
        Self {
            outcome,
            message: None,
        }
    }

    pub fn with_message(outcome: TestOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: Some(message.into()),
        }
    }

    /// Map a process exit to an outcome.
    ///
    /// - `0` -> `Passed`
    /// - `1` -> `Failed`
    /// - anything else, including death by signal (`None`) -> `Broken`
    ///
    /// Non-passing outcomes carry the last non-empty line of stderr (or
    /// stdout if stderr is empty) as their message.
    pub fn from_exit(exit_code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        let outcome = match exit_code {
            Some(0) => TestOutcome::Passed,
            Some(1) => TestOutcome::Failed,
            _ => TestOutcome::Broken,
        };

        if outcome == TestOutcome::Passed {
            return Self::new(outcome);
        }

        let message = last_line(stderr).or_else(|| last_line(stdout)).or_else(|| {
            exit_code
                .is_none()
                .then(|| "process terminated by signal".to_string())
        });

        Self { outcome, message }
    }

    pub fn is_failing(&self) -> bool {
        self.outcome.is_failing()
    }
}

fn last_line(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Status stored in the result ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Started,
    Done,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Started => f.write_str("started"),
            RecordStatus::Done => f.write_str("done"),
        }
    }
}

/// Which order strategy to use for breaking ties between eligible testcases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStrategyKind {
    /// First declared, first run.
    #[default]
    Declaration,
    /// Start the subtrees with the longest accumulated delay first.
    MaxTotalDelay,
    /// Start the subtrees with the longest historical critical path first.
    History,
}

impl FromStr for OrderStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "declaration" => Ok(OrderStrategyKind::Declaration),
            "max-total-delay" => Ok(OrderStrategyKind::MaxTotalDelay),
            "history" => Ok(OrderStrategyKind::History),
            other => Err(format!(
                "invalid order strategy: {other} (expected \"declaration\", \"max-total-delay\" or \"history\")"
            )),
        }
    }
}
