#![allow(dead_code)]

pub use suitedag_test_utils::builders;
pub use suitedag_test_utils::fake_executor;
pub use suitedag_test_utils::{init_tracing, ledger_dir, with_timeout};

use std::time::{Duration, Instant};

/// `minutes` after `start`, for driving delays without waiting.
pub fn after_minutes(start: Instant, minutes: f64) -> Instant {
    start + Duration::from_secs_f64(minutes * 60.0)
}
