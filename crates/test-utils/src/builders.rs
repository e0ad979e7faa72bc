#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use suitedag::config::{ConfigFile, ConfigSection, ExecutorSection, RawConfigFile, TestcaseConfig};
use suitedag::dag::{self, TestcaseEntry, Tree};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                executor: ExecutorSection {
                    program: "true".to_string(),
                    args: vec![],
                    env: BTreeMap::new(),
                },
                testcases: vec![],
            },
        }
    }

    pub fn with_testcase(mut self, testcase: TestcaseConfig) -> Self {
        self.config.testcases.push(testcase);
        self
    }

    pub fn with_program(mut self, program: &str, args: &[&str]) -> Self {
        self.config.executor.program = program.to_string();
        self.config.executor.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.config.config.max_concurrency = n;
        self
    }

    pub fn with_ledger_dir(mut self, dir: &Path) -> Self {
        self.config.config.ledger_dir = dir.to_path_buf();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TestcaseConfig`.
pub struct TestcaseConfigBuilder {
    testcase: TestcaseConfig,
}

impl TestcaseConfigBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            testcase: TestcaseConfig {
                id: id.to_string(),
                depends_on: None,
                delay_minutes: None,
                groups: vec![],
            },
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.testcase.depends_on = Some(dep.to_string());
        self
    }

    pub fn delay_minutes(mut self, minutes: f64) -> Self {
        self.testcase.delay_minutes = Some(toml::Value::Float(minutes));
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.testcase.groups.push(group.to_string());
        self
    }

    pub fn build(self) -> TestcaseConfig {
        self.testcase
    }
}

/// `id` with no dependency.
pub fn independent(id: &str) -> TestcaseEntry {
    TestcaseEntry::new(id)
}

/// `id` depending on `dep` after `minutes`.
pub fn dependent(id: &str, dep: &str, minutes: f64) -> TestcaseEntry {
    TestcaseEntry::new(id).after(dep, minutes)
}

/// Build a tree that is known to be valid.
pub fn tree(entries: Vec<TestcaseEntry>) -> Tree {
    dag::build(entries).expect("test tree should be valid")
}
