use anyhow::{Context, Result};
use serde::Deserialize;

use crate::bootstrap::InstallerSource;
use crate::bootstrap::parse_requirements;
use crate::resource::ResourceArchive;

pub const LAUNCH_RESOURCE: &str = "launch.json";
pub const REQUIREMENTS_RESOURCE: &str = "requirements.txt";

/// `launch.json`: what to run and what it needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_entry")]
    pub main_module: String,
    #[serde(default = "default_entry")]
    pub main_func: String,
    #[serde(default)]
    pub min_py_ver: Vec<u32>,
    /// Inline requirement list; `requirements.txt` is read when absent.
    #[serde(default)]
    pub requirements: Option<Vec<String>>,
    /// Splash text. Its presence selects the splash flow.
    #[serde(default)]
    pub splash: Option<String>,
    #[serde(default)]
    pub pre_main: Option<String>,
    #[serde(default)]
    pub program_name: Option<String>,
    /// Bundled installer script to stage instead of the launcher itself.
    #[serde(default)]
    pub installer: Option<String>,
    /// Module imported to decide whether the splash toolkit is available.
    #[serde(default = "default_toolkit")]
    pub toolkit: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            main_module: default_entry(),
            main_func: default_entry(),
            min_py_ver: Vec::new(),
            requirements: None,
            splash: None,
            pre_main: None,
            program_name: None,
            installer: None,
            toolkit: default_toolkit(),
        }
    }
}

/// Which bootstrap sequence to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Plain,
    Splash { text: String },
}

impl LaunchConfig {
    /// Read `launch.json`; programs without one get the defaults
    /// (`main.main`, `requirements.txt`, no splash).
    pub fn load(archive: &ResourceArchive) -> Result<Self> {
        match archive.read_optional(LAUNCH_RESOURCE)? {
            Some(bytes) => Self::parse(&bytes),
            None => {
                tracing::debug!("no {LAUNCH_RESOURCE}, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).with_context(|| format!("invalid {LAUNCH_RESOURCE}"))
    }

    /// The requirement list; a missing `requirements.txt` is fatal.
    pub fn requirements(&self, archive: &ResourceArchive) -> Result<Vec<String>> {
        if let Some(inline) = &self.requirements {
            return Ok(inline
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect());
        }

        let text = archive
            .read_to_string(REQUIREMENTS_RESOURCE)
            .context("cannot load the requirement list")?;
        Ok(parse_requirements(&text))
    }

    pub fn flow(&self) -> Flow {
        match &self.splash {
            Some(text) => Flow::Splash { text: text.clone() },
            None => Flow::Plain,
        }
    }

    pub fn installer_source(&self) -> InstallerSource {
        match &self.installer {
            Some(name) => InstallerSource::Resource(name.clone()),
            None => InstallerSource::CurrentExe,
        }
    }
}

fn default_entry() -> String {
    "main".to_string()
}

fn default_toolkit() -> String {
    "PySide6".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_full_launch_file() {
        let raw = br#"{
            "program_name": "Demo",
            "main_module": "demo.app",
            "main_func": "run",
            "min_py_ver": [3, 8],
            "requirements": ["PySide6", "requests"],
            "splash": "Loading Demo",
            "pre_main": "prepare"
        }"#;
        let config = LaunchConfig::parse(raw).unwrap();

        assert_eq!(config.main_module, "demo.app");
        assert_eq!(config.min_py_ver, vec![3, 8]);
        assert_eq!(
            config.flow(),
            Flow::Splash {
                text: "Loading Demo".into()
            }
        );
        assert_eq!(config.pre_main.as_deref(), Some("prepare"));
        assert_eq!(config.toolkit, "PySide6");
        assert_eq!(config.installer_source(), InstallerSource::CurrentExe);
    }

    #[test]
    fn null_splash_selects_plain_flow() {
        let config = LaunchConfig::parse(br#"{"splash": null, "installer": "installer.py"}"#).unwrap();
        assert_eq!(config.flow(), Flow::Plain);
        assert_eq!(
            config.installer_source(),
            InstallerSource::Resource("installer.py".into())
        );
    }

    #[test]
    fn missing_launch_file_uses_defaults_and_requirements_txt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REQUIREMENTS_RESOURCE), "alpha\r\n\r\nbeta\r\n").unwrap();
        let archive = ResourceArchive::locate(dir.path()).unwrap();

        let config = LaunchConfig::load(&archive).unwrap();
        assert_eq!(config, LaunchConfig::default());
        assert_eq!(config.requirements(&archive).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn missing_requirement_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ResourceArchive::locate(dir.path()).unwrap();

        let err = LaunchConfig::default().requirements(&archive).unwrap_err();
        assert!(format!("{err:#}").contains("requirements.txt"));
    }
}
