//! `strtab.toml`: where the CLI keeps its backups and QA database.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use strtab::DEFAULT_ID_SPACE_WIDTH;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "strtab.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding backup copies and their `index.json`.
    pub backup_dir: PathBuf,
    pub qa_database: PathBuf,
    /// Number of string ids per id space.
    pub id_space_width: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(".strtab/backups"),
            qa_database: PathBuf::from(".strtab/qa.sqlite3"),
            id_space_width: DEFAULT_ID_SPACE_WIDTH,
        }
    }
}

impl CliConfig {
    /// Parses a TOML document; omitted keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: CliConfig =
            toml::from_str(content).map_err(|e| format!("Invalid configuration: {}", e))?;
        if config.id_space_width == 0 {
            return Err("Invalid configuration: id_space_width must be positive".to_string());
        }
        Ok(config)
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, `strtab.toml` in the working
    /// directory is used when present and the defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }
}
