use crate::error::{GraftError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILE: &str = "gitgraft.toml";

/// Represents the complete configuration for git-graft.
///
/// Every section is optional; a missing file or section falls back to the
/// defaults below.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub rebase: RebaseConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub log: LogConfig,
}

fn default_true() -> bool {
    true
}

/// Network behavior of queries that can fetch first
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FetchConfig {
    /// Fetch before queries that offer it
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra `refs/<ns>/*` namespaces mirrored by `configure`
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            enabled: true,
            namespaces: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RebaseConfig {
    /// Keep merge commits when replaying (`--rebase-merges`)
    #[serde(default = "default_true")]
    pub preserve_merges: bool,

    /// Report rebase progress at debug level only
    #[serde(default)]
    pub silent: bool,
}

impl Default for RebaseConfig {
    fn default() -> Self {
        RebaseConfig {
            preserve_merges: true,
            silent: false,
        }
    }
}

/// Fan-out over several working copies
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct RunnerConfig {
    /// Worker count; one per CPU when unset, sequential when 0
    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub progress: bool,
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`
    #[serde(default = "default_level")]
    pub level: String,

    /// Log every git command line at info level
    #[serde(default)]
    pub show_commands: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            show_commands: false,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitgraft.toml` in current directory
/// 3. `.gitgraft.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err(GraftError::Config)` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        Path::new(path).to_path_buf()
    } else if Path::new(CONFIG_FILE).exists() {
        Path::new(CONFIG_FILE).to_path_buf()
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE));
        if config_path.exists() {
            config_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path)
        .map_err(|e| GraftError::config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&config_str)
        .map_err(|e| GraftError::config(format!("Invalid {}: {}", path.display(), e)))
}
