// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::dag::{FinishedTestcase, Scheduler, SchedulerStep, StatusCounts};
use crate::errors::{ExecutorError, LedgerError, Result};
use crate::exec::Executor;
use crate::ledger::{Ledger, RecordUpdate};

use super::{RunSummary, RuntimeOptions};

/// Drives the scheduler on a fixed interval and publishes every transition
/// to the result ledger.
///
/// This is the IO shell around `Scheduler`, which holds all scheduling
/// semantics. Ticks never wait for a process; the only blocking call is the
/// ledger lock.
pub struct Runtime<E: Executor> {
    scheduler: Scheduler<E>,
    executor: E,
    ledger: Ledger,
    options: RuntimeOptions,
}

impl<E: Executor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("ledger", &self.ledger)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Runtime<E> {
    pub fn new(scheduler: Scheduler<E>, executor: E, ledger: Ledger, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            executor,
            ledger,
            options,
        }
    }

    /// Run until every testcase is done or skipped, or until Ctrl-C.
    pub async fn run(self) -> Result<RunSummary> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Ctrl+C received; cancelling run");
        };
        self.run_until(ctrl_c).await
    }

    /// Main loop.
    ///
    /// - Ticks the scheduler every `poll_interval`.
    /// - Publishes started/finished/skipped testcases to the ledger.
    /// - On `shutdown`, kills running processes and returns a cancelled summary.
    ///
    /// Executor and ledger errors kill every running process and are returned.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        info!(
            testcases = self.scheduler.tree().len(),
            max_concurrency = self.scheduler.options().max_concurrency,
            "suitedag runtime started"
        );

        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.options.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_counts: Option<StatusCounts> = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => return self.cancel(),
                _ = interval.tick() => {}
            }

            if let Err(err) = self.tick_once() {
                error!(error = %err, "aborting run");
                self.kill_running();
                return Err(err);
            }

            let counts = self.scheduler.counts();
            if last_counts != Some(counts) {
                info!("{counts}");
                last_counts = Some(counts);
            }

            if self.scheduler.is_finished() {
                break;
            }
        }

        let summary = RunSummary::from_scheduler(&self.scheduler, false);
        info!(%summary, "run finished");
        Ok(summary)
    }

    fn tick_once(&mut self) -> Result<()> {
        let mut step = SchedulerStep::default();
        if let Err(err) = self.advance(Instant::now(), &mut step) {
            // Transitions from the phases that did complete still get recorded.
            if let Err(e) = self.publish(&step) {
                warn!(error = %e, "failed to record transitions of the aborted tick");
            }
            return Err(err.into());
        }

        if !step.is_empty() {
            debug!(
                finished = step.finished.len(),
                skipped = step.skipped.len(),
                started = step.started.len(),
                "tick produced transitions"
            );
        }
        self.publish(&step)?;
        Ok(())
    }

    /// One scheduler tick, phase by phase, filling `step` as phases complete.
    fn advance(&mut self, now: Instant, step: &mut SchedulerStep) -> std::result::Result<(), ExecutorError> {
        step.finished = self.scheduler.poll_running(now, &mut self.executor)?;
        step.skipped = self.scheduler.propagate_skips();
        step.started = self.scheduler.admit(now, &mut self.executor)?;
        Ok(())
    }

    fn publish(&self, step: &SchedulerStep) -> std::result::Result<(), LedgerError> {
        for finished in &step.finished {
            self.publish_finished(finished)?;
        }
        for (id, outcome) in &step.skipped {
            self.ledger
                .upsert_testcase_result(id, RecordUpdate::finished(outcome))?;
        }
        for id in &step.started {
            self.ledger
                .upsert_testcase_result(id, RecordUpdate::started())?;
        }
        Ok(())
    }

    fn publish_finished(&self, finished: &FinishedTestcase) -> std::result::Result<(), LedgerError> {
        if finished.outcome.is_failing() && !finished.stderr.trim().is_empty() {
            debug!(testcase = %finished.id, stderr = %finished.stderr, "output of unsuccessful testcase");
        }
        self.ledger
            .upsert_testcase_result(&finished.id, RecordUpdate::finished(&finished.outcome))
    }

    /// Hard stop requested from outside.
    fn cancel(mut self) -> Result<RunSummary> {
        let cancelled = self.scheduler.cancel(Instant::now(), &mut self.executor);
        for finished in &cancelled {
            self.publish_finished(finished)?;
        }

        let summary = RunSummary::from_scheduler(&self.scheduler, true);
        warn!(%summary, "run cancelled");
        Ok(summary)
    }

    fn kill_running(&mut self) {
        let killed = self.scheduler.cancel(Instant::now(), &mut self.executor);
        if killed.is_empty() {
            return;
        }
        for finished in &killed {
            if let Err(e) = self.publish_finished(finished) {
                warn!(testcase = %finished.id, error = %e, "failed to record killed testcase");
            }
        }
        let ids: Vec<&str> = killed.iter().map(|f| f.id.as_str()).collect();
        warn!(testcases = ?ids, "killed running testcases after fatal error");
    }
}
