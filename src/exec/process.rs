// src/exec/process.rs

//! Real executor: one OS process per testcase.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ExecutorSection;
use crate::errors::ExecutorError;
use crate::exec::backend::{Executor, ProcessExit, ProcessPoll};

/// Placeholder replaced by the testcase id in program arguments.
pub const TESTCASE_PLACEHOLDER: &str = "{testcase}";
/// Environment variable carrying the testcase id into the worker.
pub const TESTCASE_ENV: &str = "SUITEDAG_TESTCASE";
/// Environment variable carrying the ledger directory into the worker.
pub const LEDGER_DIR_ENV: &str = "SUITEDAG_LEDGER_DIR";

/// How long output readers may keep going after the process itself exited.
/// Background children that inherited the pipes can hold them open forever.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Spawns `program args...` for each testcase.
///
/// Must be used from within a Tokio runtime: output streams are drained by
/// background tasks.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    ledger_dir: PathBuf,
}

/// A running testcase process plus its captured output.
#[derive(Debug)]
pub struct ProcessHandle {
    id: String,
    child: Child,
    stdout: OutputCapture,
    stderr: OutputCapture,
    /// First poll that saw the process gone.
    exited_at: Option<Instant>,
}

/// Lines collected from one output stream by a background reader.
#[derive(Debug)]
struct OutputCapture {
    buffer: Arc<Mutex<String>>,
    reader: Option<JoinHandle<()>>,
}

impl OutputCapture {
    fn spawn<R>(stream: Option<R>, testcase: &str, label: &'static str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(String::new()));
        let reader = stream.map(|stream| {
            let buffer = Arc::clone(&buffer);
            let testcase = testcase.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(testcase = %testcase, "{label}: {}", line);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push_str(&line);
                        buf.push('\n');
                    }
                }
            })
        });

        Self { buffer, reader }
    }

    /// Stream reached EOF (or was never captured).
    fn is_drained(&self) -> bool {
        self.reader.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop reading; whatever was captured so far is kept.
    fn abort(&self) {
        if let Some(reader) = &self.reader {
            reader.abort();
        }
    }

    fn take(&self) -> String {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

impl ProcessExecutor {
    pub fn new(section: &ExecutorSection, ledger_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: section.program.clone(),
            args: section.args.clone(),
            env: section.env.clone(),
            ledger_dir: ledger_dir.into(),
        }
    }

    fn command_for(&self, id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|a| a.replace(TESTCASE_PLACEHOLDER, id)))
            .envs(&self.env)
            .env(TESTCASE_ENV, id)
            .env(LEDGER_DIR_ENV, &self.ledger_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Executor for ProcessExecutor {
    type Handle = ProcessHandle;

    fn start(&mut self, id: &str) -> Result<ProcessHandle, ExecutorError> {
        info!(testcase = %id, program = %self.program, "starting testcase process");

        let mut child = self
            .command_for(id)
            .spawn()
            .map_err(|source| ExecutorError::Launch {
                id: id.to_string(),
                source,
            })?;

        let stdout = OutputCapture::spawn(child.stdout.take(), id, "stdout");
        let stderr = OutputCapture::spawn(child.stderr.take(), id, "stderr");

        Ok(ProcessHandle {
            id: id.to_string(),
            child,
            stdout,
            stderr,
            exited_at: None,
        })
    }

    fn poll(&mut self, handle: &mut ProcessHandle) -> Result<ProcessPoll, ExecutorError> {
        let status = handle.child.try_wait().map_err(|source| ExecutorError::Poll {
            id: handle.id.clone(),
            source,
        })?;

        let Some(status) = status else {
            return Ok(ProcessPoll::Running);
        };

        // The process is gone; give its pipes a short grace period to hit EOF.
        let exited_at = *handle.exited_at.get_or_insert_with(Instant::now);
        if !handle.stdout.is_drained() || !handle.stderr.is_drained() {
            if exited_at.elapsed() < OUTPUT_GRACE {
                return Ok(ProcessPoll::Running);
            }
            debug!(testcase = %handle.id, "output still open after exit; detaching readers");
            handle.stdout.abort();
            handle.stderr.abort();
        }

        info!(
            testcase = %handle.id,
            exit_code = status.code(),
            success = status.success(),
            "testcase process exited"
        );

        Ok(ProcessPoll::Exited(ProcessExit {
            exit_code: status.code(),
            stdout: handle.stdout.take(),
            stderr: handle.stderr.take(),
        }))
    }

    fn kill(&mut self, handle: &mut ProcessHandle) -> Result<(), ExecutorError> {
        info!(testcase = %handle.id, "killing testcase process");
        handle.child.start_kill().map_err(|source| ExecutorError::Kill {
            id: handle.id.clone(),
            source,
        })
    }
}
