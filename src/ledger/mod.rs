// src/ledger/mod.rs

//! Shared, file-backed result ledger.
//!
//! The ledger directory contains:
//!
//! - `results.json`: the ledger document (see [`model`]).
//! - `results.json.lock`: a lock file that is never truncated or replaced.
//!
//! The scheduler and every worker process write to the same ledger. Each
//! write takes an exclusive, blocking lock on the lock file, re-reads the
//! document, applies one change and atomically replaces `results.json`
//! before the lock is released. Nothing is cached between calls.

pub mod model;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use debug_ignore::DebugIgnore;
use tracing::{debug, trace};

use crate::errors::LedgerError;

pub use model::{
    LedgerDocument, RecordState, RecordUpdate, TestRecord, TestcaseRecord, Timestamp,
};

pub const LEDGER_FILE_NAME: &str = "results.json";
pub const LOCK_FILE_NAME: &str = "results.json.lock";

/// Handle to a ledger directory.
///
/// Cheap to clone; holds no open files between calls.
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
}

impl Ledger {
    /// The directory is not created; writing to a missing directory fails.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the ledger document.
    pub fn path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE_NAME)
    }

    /// Acquire the exclusive lock and read the current document.
    ///
    /// Blocks until no other writer, in this process or another, holds the
    /// lock. The lock is released when the returned guard is dropped.
    pub fn lock_exclusive(&self) -> Result<LockedLedger<'_>, LedgerError> {
        let lock_path = self.dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| LedgerError::Lock {
                path: lock_path.clone(),
                source,
            })?;

        file.lock().map_err(|source| LedgerError::Lock {
            path: lock_path,
            source,
        })?;
        trace!(dir = ?self.dir, "ledger lock acquired");

        let document = read_document(&self.path())?;

        Ok(LockedLedger {
            ledger: self,
            locked_file: DebugIgnore(file),
            document,
        })
    }

    /// Start the run with an empty ledger, discarding previous contents.
    pub fn cleanup(&self) -> Result<(), LedgerError> {
        let mut locked = self.lock_exclusive()?;
        locked.document = LedgerDocument::default();
        locked.commit()?;
        debug!(path = ?self.path(), "ledger reset");
        Ok(())
    }

    /// Insert or update the record of one test inside a testcase.
    ///
    /// The owning testcase record is created if it does not exist yet.
    pub fn upsert_test_result(
        &self,
        testcase_id: &str,
        test_id: &str,
        update: RecordUpdate,
    ) -> Result<(), LedgerError> {
        let mut locked = self.lock_exclusive()?;
        let now = model::now();

        let testcase = locked.document.testcase_entry(testcase_id);
        match testcase.tests.iter_mut().find(|t| t.name == test_id) {
            Some(test) => test.state.apply(&update, now),
            None => testcase.tests.push(TestRecord {
                name: test_id.to_string(),
                state: RecordState::from_update(&update, now),
            }),
        }

        locked.commit()?;
        debug!(
            testcase = %testcase_id,
            test = %test_id,
            status = %update.status,
            outcome = ?update.outcome,
            "ledger: test result recorded"
        );
        Ok(())
    }

    /// Insert or update the summary record of a testcase.
    pub fn upsert_testcase_result(
        &self,
        testcase_id: &str,
        update: RecordUpdate,
    ) -> Result<(), LedgerError> {
        let mut locked = self.lock_exclusive()?;
        let now = model::now();

        let existed = locked.document.testcase(testcase_id).is_some();
        let testcase = locked.document.testcase_entry(testcase_id);
        if existed {
            testcase.state.apply(&update, now);
        } else {
            testcase.state = RecordState::from_update(&update, now);
        }

        locked.commit()?;
        debug!(
            testcase = %testcase_id,
            status = %update.status,
            outcome = ?update.outcome,
            "ledger: testcase result recorded"
        );
        Ok(())
    }

    /// Read the current document under the lock.
    pub fn load(&self) -> Result<LedgerDocument, LedgerError> {
        Ok(self.lock_exclusive()?.document)
    }
}

/// A ledger that has been locked for exclusive access.
///
/// The lifetime parameter ensures this isn't held for longer than the
/// corresponding [`Ledger`].
#[derive(Debug)]
pub struct LockedLedger<'ledger> {
    ledger: &'ledger Ledger,
    // Held for RAII lock semantics; the lock is released when this struct is dropped.
    #[expect(dead_code, reason = "held for lock duration")]
    locked_file: DebugIgnore<File>,
    document: LedgerDocument,
}

impl LockedLedger<'_> {
    /// Atomically replace the on-disk document with the in-memory one.
    ///
    /// Consumes self, releasing the lock once the file is in place.
    pub fn commit(self) -> Result<(), LedgerError> {
        let path = self.ledger.path();
        let json = serde_json::to_string_pretty(&self.document).map_err(|source| {
            LedgerError::Serialize {
                path: path.clone(),
                source,
            }
        })?;

        atomicwrites::AtomicFile::new(&path, atomicwrites::AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| LedgerError::Write {
                path,
                source: match error {
                    atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => e,
                },
            })?;

        Ok(())
    }
}

fn read_document(path: &Path) -> Result<LedgerDocument, LedgerError> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(LedgerDocument::default()),
        Ok(contents) => serde_json::from_str(&contents).map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(LedgerDocument::default()),
        Err(source) => Err(LedgerError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
