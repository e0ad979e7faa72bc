// src/discovery.rs

//! Testcase discovery.
//!
//! Discovery yields the flat list of declared testcases the graph builder
//! consumes. The bundled implementation reads `[[testcase]]` tables from the
//! config file; other sources only need to implement [`Discovery`].

use tracing::debug;

use crate::config::{ConfigFile, TestcaseConfig};
use crate::dag::{DelayValue, TestcaseEntry};
use crate::errors::Result;

pub trait Discovery {
    /// Testcases in declaration order.
    fn discover(&self) -> Result<Vec<TestcaseEntry>>;
}

/// Discovery backed by the `[[testcase]]` tables of a config file.
#[derive(Debug, Clone, Copy)]
pub struct ManifestDiscovery<'a> {
    testcases: &'a [TestcaseConfig],
}

impl<'a> ManifestDiscovery<'a> {
    pub fn new(cfg: &'a ConfigFile) -> Self {
        Self {
            testcases: &cfg.testcases,
        }
    }
}

impl Discovery for ManifestDiscovery<'_> {
    fn discover(&self) -> Result<Vec<TestcaseEntry>> {
        let entries: Vec<TestcaseEntry> = self
            .testcases
            .iter()
            .map(|tc| TestcaseEntry {
                id: tc.id.clone(),
                depends_on: tc.depends_on.clone(),
                delay_minutes: tc.delay_minutes.as_ref().map(delay_from_toml),
                groups: tc.groups.clone(),
            })
            .collect();

        debug!(testcases = entries.len(), "discovered testcases from manifest");
        Ok(entries)
    }
}

fn delay_from_toml(value: &toml::Value) -> DelayValue {
    match value {
        toml::Value::Integer(i) => DelayValue::Minutes(*i as f64),
        toml::Value::Float(f) => DelayValue::Minutes(*f),
        toml::Value::String(s) => DelayValue::Unparsed(s.clone()),
        other => DelayValue::Unparsed(other.to_string()),
    }
}

/// Select testcases by group membership.
///
/// - With a non-empty `include` list, a testcase must belong to at least one
///   of those groups.
/// - A testcase belonging to any `exclude` group is dropped.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl GroupFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, entry: &TestcaseEntry) -> bool {
        let included =
            self.include.is_empty() || entry.groups.iter().any(|g| self.include.contains(g));
        let excluded = entry.groups.iter().any(|g| self.exclude.contains(g));
        included && !excluded
    }

    pub fn apply(&self, entries: Vec<TestcaseEntry>) -> Vec<TestcaseEntry> {
        if self.is_empty() {
            return entries;
        }

        let before = entries.len();
        let kept: Vec<TestcaseEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        debug!(
            before,
            after = kept.len(),
            include = ?self.include,
            exclude = ?self.exclude,
            "applied group filter"
        );
        kept
    }
}
