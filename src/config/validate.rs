// src/config/validate.rs

//! Run-wide sanity checks on a parsed config file.
//!
//! Testcase graph rules (dependencies, delays, cycles) are not checked here;
//! they belong to `dag::builder`, which sees the testcases after discovery
//! and group filtering. The history file requirement is checked by
//! `dag::strategy_for`, after CLI overrides are applied.

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SuitedagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SuitedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.executor, raw.testcases))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_executor(cfg)?;
    validate_testcase_ids(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_concurrency == 0 {
        return Err(SuitedagError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.poll_interval.is_zero() {
        return Err(SuitedagError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_executor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.executor.program.trim().is_empty() {
        return Err(SuitedagError::ConfigError(
            "[executor].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_testcase_ids(cfg: &RawConfigFile) -> Result<()> {
    if let Some(tc) = cfg.testcases.iter().find(|tc| tc.id.trim().is_empty()) {
        return Err(SuitedagError::ConfigError(format!(
            "[[testcase]] entries must have a non-empty id (found {:?})",
            tc.id
        )));
    }
    Ok(())
}
