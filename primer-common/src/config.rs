//! Configuration loading and file resolution
//!
//! Resolution follows a fixed priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PRIMER_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns the TOML schema and the file/ENV plumbing. Turning the
//! layers into a resolved settings struct is done by the consuming crate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PRIMER_CONFIG";

/// Environment variable naming the store location
pub const DATABASE_ENV_VAR: &str = "PRIMER_DATABASE";

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[pipeline]` section. Every field is optional so that ENV and CLI can layer on top.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    pub exclude: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
    pub concurrency: Option<usize>,
    pub approval_threshold: Option<f64>,
    pub max_issues: Option<usize>,
    pub extract_timeout_secs: Option<u64>,
    pub data_prefix_bytes: Option<usize>,
    pub expected_files: Option<Vec<String>>,
    pub plausibility_variance: Option<f64>,
    pub store_lock_wait_ms: Option<u64>,
}

/// `[extractor]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractorSection {
    /// `noop`, `rule` or `http`
    pub kind: Option<String>,
    /// Endpoint for the `http` extractor
    pub endpoint: Option<String>,
    /// Maximum characters handed to the extractor per file
    pub max_length: Option<usize>,
}

/// One `[[modules]]` entry overriding the built-in module registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleEntry {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite store location
    pub database: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub extractor: ExtractorSection,

    /// Registry version label for an override registry
    pub registry_version: Option<String>,

    /// Module registry override; empty means "use the built-in registry"
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

/// Locate the config file to load
///
/// Explicit locations (CLI, `PRIMER_CONFIG`) are returned as-is so that a
/// missing explicit file is reported. The platform default is only returned
/// when it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let default = dirs::config_dir().map(|d| d.join("primer").join("config.toml"))?;
    default.exists().then_some(default)
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// The effective TOML layer and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub toml: TomlConfig,
    /// `None` when no file was found and compiled defaults are in use
    pub source: Option<PathBuf>,
}

/// Load the effective TOML layer
///
/// No file at all is not an error: defaults are used. Config is loaded
/// before logging is set up, so reporting the source is left to the caller.
pub fn load_config(cli_arg: Option<&Path>) -> Result<LoadedConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => Ok(LoadedConfig {
            toml: load_toml_config(&path)?,
            source: Some(path),
        }),
        None => Ok(LoadedConfig {
            toml: TomlConfig::default(),
            source: None,
        }),
    }
}

/// Read and parse a `PRIMER_*` environment override
///
/// Unset or empty variables yield `Ok(None)`; unparsable values are a config error.
pub fn env_override<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(None),
    }
}

/// Comma-separated list override (`PRIMER_EXCLUDE=.git,target`)
pub fn env_list_override(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().and_then(|raw| {
        let items: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    })
}

/// OS-dependent default store location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("primer").join("primer.db"))
        .unwrap_or_else(|| PathBuf::from("./primer_data/primer.db"))
}

/// Store location: CLI > `PRIMER_DATABASE` > TOML > default
pub fn resolve_database_path(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &toml.database {
        return path.clone();
    }
    default_database_path()
}
