use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no usable config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: Database,
    pub scheduler: Scheduler,
    pub http: Http,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
    /// Path to the local libsql database file
    pub path: path::PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Scheduler {
    /// How often monitor configuration is re-read from storage
    pub reload_interval_seconds: u64,
    /// Capacity of the check-report channel between tasks and orchestrator
    pub report_channel_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Http {
    /// Client-level request timeout; monitors may override per check
    pub default_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database { path: "entrywatch.db".into() },
            scheduler: Scheduler { reload_interval_seconds: 30, report_channel_capacity: 100 },
            http: Http { default_timeout_seconds: 10 },
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/entrywatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("entrywatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Internal Configuration State:")?;
        writeln!(f, "  Database")?;
        writeln!(f, "    Path: {}", self.database.path.display())?;
        writeln!(f, "  Scheduler")?;
        writeln!(f, "    Reload Interval: {}s", self.scheduler.reload_interval_seconds)?;
        writeln!(f, "    Report Channel Capacity: {}", self.scheduler.report_channel_capacity)?;
        writeln!(f, "  Http")?;
        writeln!(f, "    Default Timeout: {}s", self.http.default_timeout_seconds)?;
        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file.
    ///
    /// Creates a default config at the default path (or the specified path,
    /// normalized to a .toml name) if one does not exist yet.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::Read)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Write)?;
        }

        fs::write(path, config_str).map_err(Error::Write)
    }
}
