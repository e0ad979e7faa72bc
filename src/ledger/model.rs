// src/ledger/model.rs

//! On-disk shape of the result ledger.
//!
//! ```json
//! {
//!   "testcases": [
//!     {
//!       "id": "Shop\\LoginTest",
//!       "status": "done",
//!       "outcome": "passed",
//!       "start": "2026-10-18T10:00:00+02:00",
//!       "end": "2026-10-18T10:01:12+02:00",
//!       "tests": [
//!         { "name": "testLogin", "status": "done", "outcome": "passed", "start": "...", "end": "..." }
//!       ]
//!     }
//!   ]
//! }
//! ```

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

use crate::types::{ExitOutcome, RecordStatus, TestOutcome};

pub type Timestamp = DateTime<FixedOffset>;

pub(crate) fn now() -> Timestamp {
    Local::now().fixed_offset()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub testcases: Vec<TestcaseRecord>,
}

impl LedgerDocument {
    pub fn testcase(&self, id: &str) -> Option<&TestcaseRecord> {
        self.testcases.iter().find(|t| t.id == id)
    }

    pub fn test(&self, testcase_id: &str, name: &str) -> Option<&TestRecord> {
        self.testcase(testcase_id)?.tests.iter().find(|t| t.name == name)
    }

    /// Find the testcase record, appending a placeholder if it is missing.
    pub(crate) fn testcase_entry(&mut self, id: &str) -> &mut TestcaseRecord {
        let pos = match self.testcases.iter().position(|t| t.id == id) {
            Some(pos) => pos,
            None => {
                self.testcases.push(TestcaseRecord {
                    id: id.to_string(),
                    state: RecordState::placeholder(),
                    tests: Vec::new(),
                });
                self.testcases.len() - 1
            }
        };
        &mut self.testcases[pos]
    }
}

/// Testcase-level summary with its nested test records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestcaseRecord {
    pub id: String,
    #[serde(flatten)]
    pub state: RecordState,
    #[serde(default)]
    pub tests: Vec<TestRecord>,
}

/// One individual test inside a testcase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    #[serde(flatten)]
    pub state: RecordState,
}

/// Fields shared by testcase and test records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordState {
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

impl RecordState {
    fn placeholder() -> Self {
        Self {
            status: RecordStatus::Started,
            outcome: None,
            message: None,
            start: None,
            end: None,
        }
    }

    pub(crate) fn from_update(update: &RecordUpdate, now: Timestamp) -> Self {
        let mut state = Self::placeholder();
        state.apply(update, now);
        state
    }

    /// Merge an update into an existing record.
    ///
    /// `start` is only ever filled in once; a `done` record never goes back
    /// to `started`.
    pub(crate) fn apply(&mut self, update: &RecordUpdate, now: Timestamp) {
        match update.status {
            RecordStatus::Started => {
                if self.start.is_none() {
                    self.start = Some(now);
                }
            }
            RecordStatus::Done => {
                self.status = RecordStatus::Done;
                self.outcome = update.outcome;
                self.message = update.message.clone();
                self.end = Some(now);
            }
        }
    }
}

/// A status change to upsert into the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub status: RecordStatus,
    pub outcome: Option<TestOutcome>,
    pub message: Option<String>,
}

impl RecordUpdate {
    pub fn started() -> Self {
        Self {
            status: RecordStatus::Started,
            outcome: None,
            message: None,
        }
    }

    pub fn done(outcome: TestOutcome) -> Self {
        Self {
            status: RecordStatus::Done,
            outcome: Some(outcome),
            message: None,
        }
    }

    pub fn finished(exit: &ExitOutcome) -> Self {
        Self {
            message: exit.message.clone(),
            ..Self::done(exit.outcome)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
