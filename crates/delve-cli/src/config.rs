//! TOML configuration with environment overrides.
//!
//! Resolution order: `--config` > `DELVE_CONFIG` > `~/.delve/config.toml`
//! (only if present) > defaults. `DELVE_WIKI_URL`, `DELVE_MODEL_URL` and
//! `DELVE_ADDR` are applied last. The API key never lives in the file; only
//! the name of the variable holding it does.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Result};
use delve_net::{LookupConfig, ModelConfig};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub lookup: LookupConfig,
    pub model: ModelConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    dirs_home().join(".delve").join("config.toml")
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let chosen = explicit
            .map(PathBuf::from)
            .or_else(|| env::var("DELVE_CONFIG").ok().map(PathBuf::from));

        let mut config = match chosen {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = default_config_path();
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides; `var` is injectable for tests.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("DELVE_WIKI_URL") {
            self.lookup.api_url = url;
        }
        if let Some(url) = non_empty("DELVE_MODEL_URL") {
            self.model.api_url = url;
        }
        if let Some(addr) = non_empty("DELVE_ADDR") {
            self.server.addr = addr;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }
}
