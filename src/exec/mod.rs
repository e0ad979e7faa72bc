// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `Executor` trait the scheduler drives, so tests
//!   can swap in a fake implementation.
//! - [`process`] contains `ProcessExecutor`, which runs each testcase as an
//!   OS process via `tokio::process::Command`.

pub mod backend;
pub mod process;

pub use backend::{Executor, ProcessExit, ProcessPoll};
pub use process::{LEDGER_DIR_ENV, ProcessExecutor, ProcessHandle, TESTCASE_ENV};
