use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Settings read from the rc file (`$HOME/.stageboard/rc`)
///
/// The file holds `key=value` lines. Recognised keys:
/// - `data.location` - database path, relative paths resolve against the rc directory
/// - `actor` - username used as the acting user when `--as` is not given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub data_location: Option<PathBuf>,
    pub actor: Option<String>,
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn home_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".stageboard"))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("rc"))
    }

    /// Load the rc file; a missing file yields the defaults
    pub fn load() -> Result<Config> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse(&content, path.parent()))
    }

    /// Parse rc content. Unknown keys and comment lines are ignored.
    pub fn parse(content: &str, base_dir: Option<&Path>) -> Config {
        let mut config = Config::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("Ignoring malformed config line: {}", line);
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = Some(match base_dir {
                        Some(dir) if path.is_relative() => dir.join(path),
                        _ => path,
                    });
                }
                "actor" if !value.is_empty() => config.actor = Some(value.to_string()),
                other => log::debug!("Ignoring unknown config key: {}", other),
            }
        }
        config
    }

    /// Database path from configuration or the default location
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.data_location {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("board.db")),
        }
    }
}
