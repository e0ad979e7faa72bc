// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::OrderStrategyKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// max_concurrency = 10
/// ledger_dir = "logs"
/// order = "max-total-delay"
///
/// [executor]
/// program = "vendor/bin/phpunit"
/// args = ["--filter", "{testcase}"]
///
/// [[testcase]]
/// id = "Shop\\LoginTest"
///
/// [[testcase]]
/// id = "Shop\\CheckoutTest"
/// depends_on = "Shop\\LoginTest"
/// delay_minutes = 3
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    pub executor: ExecutorSection,

    /// Testcases in declaration order.
    #[serde(default, rename = "testcase")]
    pub testcases: Vec<TestcaseConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// or [`ConfigFile::new_unchecked`] for callers that validated by other means.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub executor: ExecutorSection,
    pub testcases: Vec<TestcaseConfig>,
}

impl ConfigFile {
    pub fn new_unchecked(
        config: ConfigSection,
        executor: ExecutorSection,
        testcases: Vec<TestcaseConfig>,
    ) -> Self {
        Self {
            config,
            executor,
            testcases,
        }
    }
}

/// `[config]` section: run-wide behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of testcases running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Directory holding the result ledger. Must already exist.
    #[serde(default = "default_ledger_dir")]
    pub ledger_dir: PathBuf,

    #[serde(default)]
    pub order: OrderStrategyKind,

    /// JSON file of historical durations, for `order = "history"`.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// How often the scheduler ticks, e.g. `"300ms"`.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Kill testcase processes running longer than this, e.g. `"30m"`.
    #[serde(default, with = "humantime_serde")]
    pub process_timeout: Option<Duration>,

    /// Start dependents as soon as their dependency passed.
    #[serde(default)]
    pub ignore_delays: bool,
}

fn default_max_concurrency() -> usize {
    50
}

fn default_ledger_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(300)
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            ledger_dir: default_ledger_dir(),
            order: OrderStrategyKind::default(),
            history_file: None,
            poll_interval: default_poll_interval(),
            process_timeout: None,
            ignore_delays: false,
        }
    }
}

/// `[executor]` section: how one testcase process is launched.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    pub program: String,

    /// Arguments; `{testcase}` is replaced by the testcase id.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for every testcase process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// One `[[testcase]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct TestcaseConfig {
    pub id: String,

    #[serde(default)]
    pub depends_on: Option<String>,

    /// Number of minutes, or a string holding one. Kept loose here so the
    /// graph builder can report invalid values with the testcase id.
    #[serde(default)]
    pub delay_minutes: Option<toml::Value>,

    #[serde(default)]
    pub groups: Vec<String>,
}
