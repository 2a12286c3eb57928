use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::bootstrap::interpreter::Interpreter;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub python: PythonConfig,
    pub launcher: LauncherConfig,
    pub installer: InstallerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PythonConfig {
    pub interpreter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    pub app_path: String,
    pub staging_dir: String,
    pub probe_url: String,
    pub probe_timeout_ms: u64,
    pub extension_index_url: String,
    pub extension_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallerConfig {
    pub poll_interval_ms: u64,
    pub wrap_margin: u16,
}

const DEFAULTS: &str = include_str!("../../config/default.toml");

impl Settings {
    /// Load settings with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user = match project_dirs() {
            Some(dirs) => {
                let config_path = dirs.config_dir().join("config.toml");
                if config_path.exists() {
                    let raw = fs::read_to_string(&config_path)
                        .with_context(|| format!("failed to read {}", config_path.display()))?;
                    Some(raw)
                } else {
                    None
                }
            }
            None => None,
        };

        let mut settings = Self::from_layers(user.as_deref())?;
        settings.launcher.app_path = expand_tilde(&settings.launcher.app_path)?;
        settings.launcher.staging_dir = expand_tilde(&settings.launcher.staging_dir)?;
        Ok(settings)
    }

    /// Parse the built-in defaults and deep-merge an optional user layer over them.
    pub fn from_layers(user: Option<&str>) -> Result<Self> {
        let mut base: toml::Table = toml::from_str(DEFAULTS)?;
        if let Some(raw) = user {
            let overlay: toml::Table = toml::from_str(raw).context("invalid user config")?;
            merge_tables(&mut base, overlay);
        }

        Ok(toml::Value::Table(base).try_into()?)
    }

    pub fn interpreter(&self) -> Interpreter {
        match self.python.interpreter.trim() {
            "" => Interpreter::platform_default(),
            program => Interpreter::new(program),
        }
    }

    pub fn app_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.launcher.app_path)
    }

    pub fn staging_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.launcher.staging_dir)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.launcher.probe_timeout_ms)
    }

    pub fn extension_timeout(&self) -> Duration {
        Duration::from_millis(self.launcher.extension_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.installer.poll_interval_ms.max(1))
    }
}

pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "preflight")
}

/// Directory for log files; falls back to the system temp dir.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn expand_tilde(raw: &str) -> Result<String> {
    if !raw.starts_with('~') {
        return Ok(raw.to_string());
    }

    let home = directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(raw.replacen('~', &home.to_string_lossy(), 1))
}
