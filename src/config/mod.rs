// src/config/mod.rs

//! Configuration loading and validation for coincflow.
//!
//! Responsibilities:
//! - Define the TOML-backed section model (`model.rs`).
//! - Provide a typed view of the workflow-level options (`settings.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the options every build needs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, Section, tagged_section};
pub use settings::WorkflowSettings;
pub use validate::validate_config;
