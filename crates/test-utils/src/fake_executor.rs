use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use suitedag::errors::ExecutorError;
use suitedag::exec::{Executor, ProcessExit, ProcessPoll};

/// How a scripted testcase behaves once started.
#[derive(Debug, Clone)]
pub struct Script {
    /// `None` simulates death by signal.
    pub exit_code: Option<i32>,
    /// Number of polls that still report `Running` before the exit.
    pub polls: usize,
    pub stdout: String,
    pub stderr: String,
}

impl Script {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            polls: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn signalled() -> Self {
        Self {
            exit_code: None,
            ..Self::exit(0)
        }
    }

    pub fn after_polls(mut self, polls: usize) -> Self {
        self.polls = polls;
        self
    }

    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::exit(0)
    }
}

/// What the executor was asked to do, in call order.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    pub started: Vec<String>,
    pub killed: Vec<String>,
}

#[derive(Debug)]
pub struct ScriptedHandle {
    pub id: String,
    remaining_polls: usize,
    script: Script,
}

/// An executor that never spawns processes.
///
/// - every testcase exits according to its [`Script`] (default: exit 0 on
///   the first poll)
/// - testcases marked with [`ScriptedExecutor::failing_launch`] fail to start
/// - starts and kills are recorded in a shared [`ExecutionLog`]
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, Script>,
    default_script: Script,
    launch_failures: HashSet<String>,
    log: Arc<Mutex<ExecutionLog>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, id: &str, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    pub fn with_exit(self, id: &str, code: i32) -> Self {
        self.with_script(id, Script::exit(code))
    }

    /// Script used for testcases without their own script.
    pub fn with_default(mut self, script: Script) -> Self {
        self.default_script = script;
        self
    }

    pub fn failing_launch(mut self, id: &str) -> Self {
        self.launch_failures.insert(id.to_string());
        self
    }

    /// Shared view of the execution log; stays valid after the executor is
    /// moved into a runtime.
    pub fn log(&self) -> Arc<Mutex<ExecutionLog>> {
        Arc::clone(&self.log)
    }

    pub fn started(&self) -> Vec<String> {
        self.log.lock().unwrap().started.clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.log.lock().unwrap().killed.clone()
    }
}

impl Executor for ScriptedExecutor {
    type Handle = ScriptedHandle;

    fn start(&mut self, id: &str) -> Result<ScriptedHandle, ExecutorError> {
        if self.launch_failures.contains(id) {
            return Err(ExecutorError::Launch {
                id: id.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
            });
        }

        self.log.lock().unwrap().started.push(id.to_string());
        let script = self
            .scripts
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone());

        Ok(ScriptedHandle {
            id: id.to_string(),
            remaining_polls: script.polls,
            script,
        })
    }

    fn poll(&mut self, handle: &mut ScriptedHandle) -> Result<ProcessPoll, ExecutorError> {
        if handle.remaining_polls > 0 {
            handle.remaining_polls -= 1;
            return Ok(ProcessPoll::Running);
        }
        Ok(ProcessPoll::Exited(ProcessExit {
            exit_code: handle.script.exit_code,
            stdout: handle.script.stdout.clone(),
            stderr: handle.script.stderr.clone(),
        }))
    }

    fn kill(&mut self, handle: &mut ScriptedHandle) -> Result<(), ExecutorError> {
        self.log.lock().unwrap().killed.push(handle.id.clone());
        Ok(())
    }
}
