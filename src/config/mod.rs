// src/config/mod.rs

//! Configuration loading and validation for suitedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate run-wide settings (`validate.rs`).
//!
//! The validated [`ConfigFile`] is passed explicitly to everything that
//! needs it; there is no global configuration.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, ExecutorSection, RawConfigFile, TestcaseConfig};
pub use validate::validate_config;
