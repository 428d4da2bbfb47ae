pub mod init;
mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/judge-tally/)
///
/// Falls back to the working directory when no home directory is known.
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("judge-tally")
}

/// Get the default config file path (~/.config/judge-tally/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/judge-tally/config.yaml)
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed or has unknown keys
///
/// A missing default config file is not an error; defaults are used.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => read_config(&path, true),
        None => read_config(&get_config_path(), false),
    }
}

fn read_config(config_path: &Path, required: bool) -> Result<Config> {
    if !config_path.exists() {
        if required {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

pub fn parse_config(yaml: &str) -> Result<Config> {
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_saphyr::from_str(yaml)?)
}

/// Validate the non-scoring part of the configuration.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config
        .data_path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        errors.push("data_path: must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for (i, location) in config.locations.iter().enumerate() {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            errors.push(format!("locations[{}]: must not be empty", i));
        } else if !seen.insert(trimmed.to_lowercase()) {
            errors.push(format!("locations[{}]: duplicate location '{}'", i, trimmed));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
