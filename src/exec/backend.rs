// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The scheduler talks to an `Executor` instead of spawning processes
//! itself. Production code uses [`super::ProcessExecutor`]; tests can
//! provide an implementation that doesn't spawn real processes.
//!
//! All methods are non-blocking: the scheduler calls them from inside a
//! single cooperative tick.

use crate::errors::ExecutorError;

/// Output of a finished external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Result of a non-blocking poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPoll {
    Running,
    Exited(ProcessExit),
}

/// Trait abstracting how testcases are executed.
pub trait Executor {
    /// Ownership of one running external process.
    type Handle;

    /// Start the process for testcase `id`.
    ///
    /// An error here means the process could not be launched at all and is
    /// fatal to the run.
    fn start(&mut self, id: &str) -> Result<Self::Handle, ExecutorError>;

    /// Check whether the process has finished, without blocking.
    fn poll(&mut self, handle: &mut Self::Handle) -> Result<ProcessPoll, ExecutorError>;

    /// Ask the process to terminate.
    fn kill(&mut self, handle: &mut Self::Handle) -> Result<(), ExecutorError>;
}
