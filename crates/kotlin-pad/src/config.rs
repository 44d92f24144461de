//! User configuration
//!
//! Read from `~/.config/kpad/config.toml` (or `--config`). Every field is
//! optional; a missing file means all defaults.

use crate::ui::layout::LayoutConfig;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default execution timeout in seconds (can be overridden via KPAD_TIMEOUT)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable overriding `engine.timeout_secs`
pub const TIMEOUT_ENV: &str = "KPAD_TIMEOUT";

/// How scripts are executed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compiler name (searched on PATH) or absolute path
    pub compiler: String,
    pub script_flag: String,
    /// Suffix of the temp file the snapshot is written to
    pub file_suffix: String,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiler: "kotlinc".to_string(),
            script_flag: "-script".to_string(),
            file_suffix: ".kts".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Spaces inserted by Tab
    pub tab_width: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub editor: EditorConfig,
    pub layout: LayoutConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(_) => None,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// `~/.config/kpad/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        home::home_dir().map(|home| home.join(".config").join("kpad").join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// An explicitly named file must exist; a missing default file yields
    /// the defaults. `KPAD_TIMEOUT` is applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml(&content)
    }

    /// Apply environment overrides looked up through `var`
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var(TIMEOUT_ENV) {
            match value.trim().parse() {
                Ok(secs) => self.engine.timeout_secs = secs,
                Err(_) => warn!(value = %value, "ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }
}
