// src/dag/entry.rs

//! Declared testcases, as produced by discovery.

use std::fmt;

/// Canonical testcase identifier (e.g. a fully-qualified class name).
pub type TestcaseId = String;

/// A delay as declared by discovery.
///
/// Some discovery sources carry metadata as text; those delays stay
/// `Unparsed` until the graph builder validates them.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayValue {
    Minutes(f64),
    Unparsed(String),
}

impl DelayValue {
    /// The delay in minutes, if it is a finite, non-negative number.
    pub fn minutes(&self) -> Option<f64> {
        let minutes = match self {
            DelayValue::Minutes(m) => *m,
            DelayValue::Unparsed(raw) => raw.trim().parse::<f64>().ok()?,
        };

        (minutes.is_finite() && minutes >= 0.0).then_some(minutes)
    }
}

impl fmt::Display for DelayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayValue::Minutes(m) => write!(f, "{m}"),
            DelayValue::Unparsed(raw) => f.write_str(raw),
        }
    }
}

impl From<f64> for DelayValue {
    fn from(minutes: f64) -> Self {
        DelayValue::Minutes(minutes)
    }
}

/// One declared testcase.
#[derive(Debug, Clone, PartialEq)]
pub struct TestcaseEntry {
    pub id: TestcaseId,
    /// Testcase that must finish successfully before this one may start.
    pub depends_on: Option<TestcaseId>,
    /// Minimum time after `depends_on` finished; only meaningful with a dependency.
    pub delay_minutes: Option<DelayValue>,
    pub groups: Vec<String>,
}

impl TestcaseEntry {
    pub fn new(id: impl Into<TestcaseId>) -> Self {
        Self {
            id: id.into(),
            depends_on: None,
            delay_minutes: None,
            groups: Vec::new(),
        }
    }

    pub fn after(mut self, dependency: impl Into<TestcaseId>, delay: impl Into<DelayValue>) -> Self {
        self.depends_on = Some(dependency.into());
        self.delay_minutes = Some(delay.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}
