//! Layered configuration: defaults, then `config.toml` in the data
//! directory, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.toml";

/// Instances materialized when a recurring quest is created.
pub const DEFAULT_RECURRING_INSTANCES: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Identity every command acts as.
    pub user: String,
    pub recurring_instances: usize,
    /// Present once a calendar is connected.
    pub calendar: Option<CalendarSettings>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA name attached to every event, e.g. `Asia/Jerusalem`.
    pub time_zone: String,
    /// Hour of the due date at which events start (0-23).
    pub event_hour: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user: default_user(),
            recurring_instances: DEFAULT_RECURRING_INSTANCES,
            calendar: None,
        }
    }
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            time_zone: "UTC".to_string(),
            event_hour: 9,
        }
    }
}

fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "player".to_string())
}

impl Config {
    /// Loads `config.toml` from `dir` (if present) and applies
    /// `QUESTHUB_USER` on top.
    pub fn load(dir: &Path) -> Result<Config> {
        let path = config_path(dir);
        let mut config: Config = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            Config::default()
        };
        if let Ok(user) = std::env::var("QUESTHUB_USER") {
            config.user = user;
        }
        debug!(path = %path.display(), user = %config.user, "loaded config");
        Ok(config)
    }

    /// Writes the config back to `dir/config.toml`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::write(config_path(dir), toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}
