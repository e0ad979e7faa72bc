use std::time::{Duration, Instant};

use petgraph::graph::NodeIndex;
use tracing::{debug, info, warn};

use crate::dag::entry::TestcaseId;
use crate::dag::order::OrderStrategy;
use crate::dag::scheduler_step::{FinishedTestcase, SchedulerStep, StatusCounts};
use crate::dag::state::TestcaseState;
use crate::dag::tree::Tree;
use crate::errors::ExecutorError;
use crate::exec::{Executor, ProcessPoll};
use crate::types::{ExitOutcome, TestOutcome, TestcaseStatus};

/// Knobs for admission and process supervision.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Upper bound on testcases in `Running` at the same time.
    pub max_concurrency: usize,
    /// Treat every delay as 0; dependency order still applies.
    pub ignore_delays: bool,
    /// Kill processes that run longer than this.
    pub process_timeout: Option<Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 50,
            ignore_delays: false,
            process_timeout: None,
        }
    }
}

/// Scheduler holds the immutable tree plus the live registry of testcase
/// states for one run.
///
/// Each call to [`Scheduler::tick`] does a bounded amount of work:
/// - poll running processes and record finished ones
/// - skip testcases whose dependency did not succeed
/// - compute which queued testcases are eligible
/// - start as many eligible testcases as free slots allow
///
/// The phases are public so they can be driven one at a time.
pub struct Scheduler<E: Executor> {
    tree: Tree,
    /// Indexed by declaration index.
    states: Vec<TestcaseState<E::Handle>>,
    /// Indexed by declaration index; lower starts first.
    priorities: Vec<i64>,
    options: SchedulerOptions,
}

impl<E: Executor> std::fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("testcases", &self.tree.len())
            .field("counts", &self.counts())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Scheduler<E> {
    pub fn new(tree: Tree, strategy: &dyn OrderStrategy, options: SchedulerOptions) -> Self {
        let assigned = strategy.optimize(&tree);

        let priorities = tree
            .entries()
            .map(|node| assigned.get(tree.id(node)).copied().unwrap_or(i64::MAX))
            .collect();

        let states = tree
            .entries()
            .map(|node| TestcaseState::new(tree.id(node).to_string()))
            .collect();

        debug!(
            strategy = strategy.name(),
            testcases = tree.len(),
            max_concurrency = options.max_concurrency,
            "scheduler initialised"
        );

        Self {
            tree,
            states,
            priorities,
            options,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn state(&self, id: &str) -> Option<&TestcaseState<E::Handle>> {
        let node = self.tree.index_of(id)?;
        Some(&self.states[slot(node)])
    }

    /// All testcase states, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &TestcaseState<E::Handle>> {
        self.states.iter()
    }

    pub fn status_of(&self, id: &str) -> Option<TestcaseStatus> {
        self.state(id).map(TestcaseState::status)
    }

    pub fn outcome_of(&self, id: &str) -> Option<&ExitOutcome> {
        self.state(id)?.exit_outcome.as_ref()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for state in &self.states {
            match state.status() {
                TestcaseStatus::Queued => counts.queued += 1,
                TestcaseStatus::Prepared => counts.prepared += 1,
                TestcaseStatus::Running => counts.running += 1,
                TestcaseStatus::Done => counts.done += 1,
                TestcaseStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn running_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.status() == TestcaseStatus::Running)
            .count()
    }

    /// Every testcase is `Done` or `Skipped`.
    pub fn is_finished(&self) -> bool {
        self.states.iter().all(|s| s.status().is_terminal())
    }

    /// The run succeeded: nothing skipped and no failing outcome.
    pub fn is_successful(&self) -> bool {
        self.states.iter().all(|s| s.succeeded())
    }

    /// Run one full tick.
    pub fn tick(&mut self, now: Instant, executor: &mut E) -> Result<SchedulerStep, ExecutorError> {
        let finished = self.poll_running(now, executor)?;
        let skipped = self.propagate_skips();
        let started = self.admit(now, executor)?;

        Ok(SchedulerStep {
            finished,
            skipped,
            started,
        })
    }

    /// Phase 1: check every running process without blocking.
    ///
    /// Finished processes move their testcase to `Done` and release the
    /// handle. Processes still running past the configured timeout are killed
    /// and count as `Broken`.
    pub fn poll_running(
        &mut self,
        now: Instant,
        executor: &mut E,
    ) -> Result<Vec<FinishedTestcase>, ExecutorError> {
        let mut finished = Vec::new();

        for state in self.states.iter_mut() {
            if state.status() != TestcaseStatus::Running {
                continue;
            }
            let Some(handle) = state.handle.as_mut() else {
                warn!(testcase = %state.id, "running testcase without a process handle");
                continue;
            };

            let elapsed = state
                .started_at
                .map(|t| now.saturating_duration_since(t))
                .unwrap_or_default();

            let (outcome, stdout, stderr) = match executor.poll(handle)? {
                ProcessPoll::Exited(exit) => {
                    let outcome = ExitOutcome::from_exit(exit.exit_code, &exit.stdout, &exit.stderr);
                    (outcome, exit.stdout, exit.stderr)
                }
                ProcessPoll::Running => match self.options.process_timeout {
                    Some(timeout) if elapsed >= timeout => {
                        warn!(
                            testcase = %state.id,
                            timeout_secs = timeout.as_secs(),
                            "process exceeded timeout; killing"
                        );
                        executor.kill(handle)?;
                        let outcome = ExitOutcome::with_message(
                            TestOutcome::Broken,
                            format!("process timed out after {}s", timeout.as_secs()),
                        );
                        (outcome, String::new(), String::new())
                    }
                    _ => continue,
                },
            };

            state.handle = None;
            state.finished_at = Some(now);
            state.exit_outcome = Some(outcome.clone());
            state.transition(TestcaseStatus::Done);

            if outcome.is_failing() {
                warn!(
                    testcase = %state.id,
                    outcome = %outcome.outcome,
                    message = outcome.message.as_deref().unwrap_or(""),
                    "testcase finished unsuccessfully"
                );
            } else {
                info!(testcase = %state.id, outcome = %outcome.outcome, "testcase finished");
            }

            finished.push(FinishedTestcase {
                id: state.id.clone(),
                outcome,
                duration: elapsed,
                stdout,
                stderr,
            });
        }

        Ok(finished)
    }

    /// Phase 2: skip queued testcases whose dependency failed or was skipped.
    ///
    /// Walks the tree in preorder so a skip propagates through the whole
    /// subtree within one call.
    pub fn propagate_skips(&mut self) -> Vec<(TestcaseId, ExitOutcome)> {
        let mut skipped = Vec::new();

        for &node in self.tree.preorder() {
            let Some(dep) = self.tree.dependency(node) else {
                continue;
            };
            let i = slot(node);
            if self.states[i].status() != TestcaseStatus::Queued
                || !self.states[slot(dep)].blocks_dependents()
            {
                continue;
            }

            let dep_id = self.tree.id(dep);
            let outcome = ExitOutcome::with_message(
                TestOutcome::Skipped,
                format!("dependency {dep_id} did not succeed"),
            );

            let state = &mut self.states[i];
            state.exit_outcome = Some(outcome.clone());
            state.transition(TestcaseStatus::Skipped);
            info!(testcase = %state.id, dependency = %dep_id, "skipping testcase");
            skipped.push((state.id.clone(), outcome));
        }

        skipped
    }

    /// Phase 3: queued testcases that may start now, in admission order.
    pub fn eligible(&self, now: Instant) -> Vec<TestcaseId> {
        self.eligible_nodes(now)
            .into_iter()
            .map(|node| self.tree.id(node).to_string())
            .collect()
    }

    /// Phase 4: start eligible testcases up to the concurrency budget.
    ///
    /// Each admitted testcase passes through `Prepared` before the executor
    /// is asked to start it. A launch failure is fatal; the testcase stays
    /// `Prepared`.
    pub fn admit(&mut self, now: Instant, executor: &mut E) -> Result<Vec<TestcaseId>, ExecutorError> {
        let free = self
            .options
            .max_concurrency
            .saturating_sub(self.running_count());
        if free == 0 {
            return Ok(Vec::new());
        }

        let mut started = Vec::new();
        for node in self.eligible_nodes(now).into_iter().take(free) {
            let state = &mut self.states[slot(node)];
            state.transition(TestcaseStatus::Prepared);

            let handle = executor.start(&state.id)?;

            state.handle = Some(handle);
            state.started_at = Some(now);
            state.transition(TestcaseStatus::Running);
            info!(testcase = %state.id, "testcase started");
            started.push(state.id.clone());
        }

        Ok(started)
    }

    /// Hard stop: kill every running process.
    ///
    /// Killed testcases become `Done` with an `Incomplete` outcome. Kill
    /// failures are logged and do not stop the remaining kills.
    pub fn cancel(&mut self, now: Instant, executor: &mut E) -> Vec<FinishedTestcase> {
        let mut cancelled = Vec::new();

        for state in self.states.iter_mut() {
            if state.status() != TestcaseStatus::Running {
                continue;
            }
            if let Some(mut handle) = state.handle.take() {
                if let Err(e) = executor.kill(&mut handle) {
                    warn!(testcase = %state.id, error = %e, "failed to kill process");
                }
            }

            let outcome = ExitOutcome::with_message(TestOutcome::Incomplete, "run cancelled");
            state.finished_at = Some(now);
            state.exit_outcome = Some(outcome.clone());
            state.transition(TestcaseStatus::Done);
            info!(testcase = %state.id, "testcase cancelled");

            cancelled.push(FinishedTestcase {
                id: state.id.clone(),
                outcome,
                duration: state
                    .started_at
                    .map(|t| now.saturating_duration_since(t))
                    .unwrap_or_default(),
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        cancelled
    }

    fn eligible_nodes(&self, now: Instant) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self
            .tree
            .entries()
            .filter(|&node| self.is_eligible(node, now))
            .collect();

        nodes.sort_by_key(|&node| (self.priorities[slot(node)], self.tree.declaration_index(node)));
        nodes
    }

    fn is_eligible(&self, node: NodeIndex, now: Instant) -> bool {
        if self.states[slot(node)].status() != TestcaseStatus::Queued {
            return false;
        }

        let Some(dep) = self.tree.dependency(node) else {
            return true;
        };

        let dep_state = &self.states[slot(dep)];
        if !dep_state.succeeded() {
            return false;
        }
        if self.options.ignore_delays {
            return true;
        }

        let Some(finished_at) = dep_state.finished_at else {
            return false;
        };
        now.saturating_duration_since(finished_at) >= delay_duration(self.tree.edge_delay(node))
    }
}

/// Declaration index of a testcase node.
fn slot(node: NodeIndex) -> usize {
    node.index() - 1
}

fn delay_duration(minutes: f64) -> Duration {
    Duration::try_from_secs_f64(minutes * 60.0).unwrap_or(Duration::MAX)
}
