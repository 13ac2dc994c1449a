//! Shell configuration.
//!
//! Read from `$SHELLMARK_CONFIG`, or `config.json` in the platform config
//! directory. A missing file means defaults; a broken one is an error.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "SHELLMARK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Primary prompt template. See `prompt::PromptTemplate`.
    pub prompt: String,
    /// Mode indicator template, drawn in front of the prompt.
    pub mode_prompt: Option<String>,
    /// Program that runs each command line (`<shell> -c <line>`).
    pub shell: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "{cwd} $ ".to_string(),
            mode_prompt: None,
            shell: default_shell(),
        }
    }
}

impl ShellConfig {
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "shellmark").map(|dirs| dirs.config_dir().join("config.json"))
}

fn default_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}
