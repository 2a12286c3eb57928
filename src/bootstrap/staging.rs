use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::TempDir;

use super::interpreter::{Interpreter, InterpreterInfo};
use super::network;
use crate::error::LaunchError;
use crate::resource::ResourceArchive;

/// Fixed file stem of the staged installer. The launcher binary recognises
/// it when copied under this name.
pub const INSTALLER_STEM: &str = "package-installer";

pub const EXTENSION_DIR: &str = "wincurses";

/// Where the installer program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerSource {
    /// A copy of the running launcher executable.
    CurrentExe,
    /// A script bundled with the program, run through the interpreter.
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInstaller {
    pub path: PathBuf,
    pub via_interpreter: bool,
}

impl StagedInstaller {
    pub fn command(&self, interpreter: &Interpreter) -> Command {
        if self.via_interpreter {
            let mut command = interpreter.command();
            command.arg(&self.path);
            command
        } else {
            Command::new(&self.path)
        }
    }
}

/// Temporary directory that lives for exactly one installer run and is
/// removed when dropped, whatever happened in between.
#[derive(Debug)]
pub struct StagingDirectory {
    dir: TempDir,
}

impl StagingDirectory {
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("preflight-");
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn stage_installer(
        &self,
        source: &InstallerSource,
        archive: &ResourceArchive,
    ) -> Result<StagedInstaller> {
        match source {
            InstallerSource::CurrentExe => {
                let exe = std::env::current_exe().context("cannot locate launcher executable")?;
                let target = self
                    .path()
                    .join(format!("{INSTALLER_STEM}{}", std::env::consts::EXE_SUFFIX));
                fs::copy(&exe, &target)
                    .with_context(|| format!("failed to stage {}", exe.display()))?;
                Ok(StagedInstaller {
                    path: target,
                    via_interpreter: false,
                })
            }
            InstallerSource::Resource(name) => {
                let resolved = archive
                    .find(name)?
                    .ok_or_else(|| LaunchError::NotFound(name.clone()))?;
                let extracted = archive.extract(&resolved, self.path())?;
                let target = match Path::new(name).extension() {
                    Some(ext) => self
                        .path()
                        .join(format!("{INSTALLER_STEM}.{}", ext.to_string_lossy())),
                    None => self.path().join(INSTALLER_STEM),
                };
                if extracted != target {
                    fs::rename(&extracted, &target)?;
                }
                Ok(StagedInstaller {
                    path: target,
                    via_interpreter: true,
                })
            }
        }
    }

    /// Unpack the native terminal extension matching `info` into `wincurses/`,
    /// from the bundled wheel if there is one, else from the package index.
    pub fn stage_terminal_extension(
        &self,
        archive: &ResourceArchive,
        info: &InterpreterInfo,
        index_url: &str,
        timeout: std::time::Duration,
    ) -> Result<Vec<PathBuf>> {
        let dest = self.path().join(EXTENSION_DIR);
        fs::create_dir_all(&dest)?;

        let bundled = bundled_extension_name(info);
        let modules = match archive.read_optional(&bundled)? {
            Some(bytes) => {
                tracing::debug!(artifact = %bundled, "using bundled terminal extension");
                network::extract_native_modules(Cursor::new(bytes), &dest)?
            }
            None => network::download_extension(index_url, info, &dest, timeout)?,
        };

        if modules.is_empty() {
            return Err(LaunchError::ExtensionMissing(info.to_string()).into());
        }
        Ok(modules)
    }
}

/// `wincurses/curses-cp311_64.whl` for a 64-bit Python 3.11.
pub fn bundled_extension_name(info: &InterpreterInfo) -> String {
    format!(
        "{EXTENSION_DIR}/curses-cp{}{}_{}.whl",
        info.major(),
        info.minor(),
        if info.is_64bit() { "64" } else { "32" }
    )
}
