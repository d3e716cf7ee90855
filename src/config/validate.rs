// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.manager,
            raw.tools,
            raw.project_parts,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_tools(cfg)?;
    ensure_has_project_parts(cfg)?;
    validate_project_parts(cfg)?;
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    if cfg.tools.scanner.trim().is_empty() {
        return Err(PchError::ConfigError(
            "[tools].scanner must name a dependency scanner command".to_string(),
        ));
    }
    if cfg.tools.compiler.trim().is_empty() {
        return Err(PchError::ConfigError(
            "[tools].compiler must name a compiler command".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_project_parts(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project_parts.is_empty() {
        return Err(PchError::ConfigError(
            "config must contain at least one [[project_part]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_project_parts(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for part in &cfg.project_parts {
        if part.id.trim().is_empty() {
            return Err(PchError::ConfigError(
                "project part id must not be empty".to_string(),
            ));
        }
        if !seen.insert(part.id.as_str()) {
            return Err(PchError::ConfigError(format!(
                "duplicate project part id '{}'",
                part.id
            )));
        }
        if part.sources.is_empty() {
            return Err(PchError::ConfigError(format!(
                "project part '{}' must list at least one source",
                part.id
            )));
        }
        if let Some(position) = part.macros.iter().position(|m| m.name.trim().is_empty()) {
            return Err(PchError::ConfigError(format!(
                "project part '{}' has a macro without a name (entry {})",
                part.id,
                position + 1
            )));
        }
    }
    Ok(())
}
