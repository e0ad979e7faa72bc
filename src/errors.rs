// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ConfigurationError`]: the testcase graph is invalid (always detected
//!   before anything is started).
//! - [`ExecutorError`]: an external process could not be launched or observed.
//! - [`LedgerError`]: the result ledger could not be locked, read or written.
//!
//! All of them roll up into [`SuitedagError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("testcase '{0}' is declared more than once")]
    DuplicateTestcase(String),

    #[error("testcase '{id}' depends on unknown testcase '{target}'")]
    UnknownDependency { id: String, target: String },

    #[error("testcase '{id}' has a delay of {delay} minutes but no dependency")]
    DelayWithoutDependency { id: String, delay: String },

    #[error("testcase '{id}' has an invalid delay '{value}' (expected a non-negative number of minutes)")]
    InvalidDelay { id: String, value: String },

    #[error("cyclic dependency between testcases: {}", display_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },
}

/// `A -> B -> A`, read as "A depends on B, which depends on A".
fn display_cycle(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to launch process for testcase '{id}': {source}")]
    Launch {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to poll process for testcase '{id}': {source}")]
    Poll {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to kill process for testcase '{id}': {source}")]
    Kill {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("failed to lock ledger at {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read ledger at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ledger at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize ledger for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write ledger at {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SuitedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid testcase graph: {0}")]
    Graph(#[from] ConfigurationError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SuitedagError>;
