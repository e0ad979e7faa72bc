// src/dag/mod.rs

//! Dependency tree and scheduling.
//!
//! - [`entry`] holds declared testcases as discovery reports them.
//! - [`builder`] validates entries and builds the [`Tree`].
//! - [`tree`] is the immutable, arena-backed dependency tree.
//! - [`order`] contains the pluggable order strategies.
//! - [`state`] tracks per-testcase lifecycle state.
//! - [`scheduler`] contains the tick state machine that decides which
//!   testcases start, finish or get skipped.
//! - [`scheduler_step`] defines the result type for ticks.

pub mod builder;
pub mod entry;
pub mod order;
pub mod scheduler;
pub mod scheduler_step;
pub mod state;
pub mod tree;

pub use builder::build;
pub use entry::{DelayValue, TestcaseEntry, TestcaseId};
pub use order::{DeclarationOrder, HistoricalDuration, MaxTotalDelay, OrderStrategy, strategy_for};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use scheduler_step::{FinishedTestcase, SchedulerStep, StatusCounts};
pub use state::TestcaseState;
pub use tree::Tree;
