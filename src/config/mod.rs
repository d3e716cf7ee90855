// src/config/mod.rs

//! Configuration loading and validation for pchdeps.
//!
//! - `model.rs`: the TOML-backed data model and its conversion into
//!   [`ProjectPart`](crate::model::ProjectPart)s.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: the `RawConfigFile` -> `ConfigFile` checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, IncludePathConfig, MacroConfig, ManagerSection, ProjectPartConfig, RawConfigFile,
    ToolsSection,
};
