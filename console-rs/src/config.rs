//! `console.toml` configuration.
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `settings_file` | `<data dir>/settings.json` | persisted macros and colours |
//! | `log_level` | `"warn"` | tracing filter when `RUST_LOG` is unset |
//! | `prompt` | `"> "` | input prompt |
//! | `continuation_prompt` | `". "` | prompt while a unit is incomplete |
//! | `color` | `true` | styled output (off when stdout is not a tty) |
//! | `[colors]` | | category name → colour name or `#rrggbb` |
//!
//! Every key is optional; a missing file is the same as an empty one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

const CONFIG_FILE: &str = "console.toml";
const SETTINGS_FILE: &str = "settings.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "oolite", "ooconsole")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings_file: Option<PathBuf>,
    pub log_level: String,
    pub prompt: String,
    pub continuation_prompt: String,
    pub color: bool,
    pub colors: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_file: None,
            log_level: "warn".to_owned(),
            prompt: "> ".to_owned(),
            continuation_prompt: ". ".to_owned(),
            color: true,
            colors: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parse TOML text; `path` is only used in error messages.
    pub fn load_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Toml {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Self::load_str(&text, path)
    }

    /// Load `explicit` if given (it must exist), else the default config
    /// file if there is one, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/console.toml` for this platform.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join(CONFIG_FILE))
    }

    /// Where settings are persisted.
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_file
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().join(SETTINGS_FILE)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
