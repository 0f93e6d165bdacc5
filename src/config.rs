use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const APP_NAME: &str = "pay_to_snooze";

const fn default_poll_interval() -> u64 {
    5
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

/// Daemon and CLI configuration, kept apart from the alarm data itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// seconds between alarm checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// where alarms and settings are stored, defaults to the platform data dir
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// chrono format string for times in `list`
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            data_dir: None,
            time_format: default_time_format(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the config at `path`, or the defaults if there is none yet.
    pub fn load(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&config)?)
    }

    pub fn save(&self, path: PathBuf) -> Result<()> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        // zero would spin
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// The directory the key-value store lives in.
    pub fn data_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let mut path = project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    pub fn is_config_present() -> Result<bool> {
        Ok(Self::config_path()?.exists())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME).ok_or(Error::NoProjectDirs)
}
