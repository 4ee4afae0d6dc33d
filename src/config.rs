use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::agent::DEFAULT_TIMEOUT_SECS;
use crate::{swlog_debug, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent command used for phase actions.
    pub command: Option<String>,
    /// Root of the artifact tree; relative to the manifest unless absolute.
    pub artifacts_dir: Option<String>,
    /// Admission cap override.
    pub max_concurrent: Option<usize>,
    /// Timeout for one phase action, in seconds.
    pub phase_timeout_secs: Option<u64>,
}

impl Config {
    pub fn swell_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".swell"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::swell_dir()?.join("swell.toml"))
    }

    pub fn effective_command(&self) -> &str {
        self.command.as_deref().unwrap_or("claude")
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn artifacts_dir_path(&self) -> Option<PathBuf> {
        self.artifacts_dir.as_deref().map(expand_tilde)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        swlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            swlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        swlog_debug!(
            "Config loaded: command={:?}, artifacts_dir={:?}, max_concurrent={:?}",
            config.command,
            config.artifacts_dir,
            config.max_concurrent
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let swell_dir = Self::swell_dir()?;
        if !swell_dir.exists() {
            fs::create_dir_all(&swell_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        swlog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
