use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use super::checker::DependencyChecker;
use super::interpreter::Interpreter;
use super::network;
use super::package::PackageManager;
use super::spawn::{SpawnPolicy, exit_code};
use super::staging::{InstallerSource, StagingDirectory};
use crate::model::config::Settings;
use crate::resource::ResourceArchive;

/// Exit status when the installer cannot run because the network is down.
pub const OFFLINE_STATUS: i32 = 1;

/// Makes sure the requirements are installed; `0` means ready to run.
pub trait DependencyInstaller {
    fn ensure_installed(&self, requirements: &[String]) -> Result<i32>;
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub staging_parent: Option<PathBuf>,
    pub probe_url: String,
    pub probe_timeout: Duration,
    pub extension_index_url: String,
    pub extension_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            staging_parent: settings.staging_dir(),
            probe_url: settings.launcher.probe_url.clone(),
            probe_timeout: settings.probe_timeout(),
            extension_index_url: settings.launcher.extension_index_url.clone(),
            extension_timeout: settings.extension_timeout(),
        }
    }
}

/// Stages the installer and runs it as a child process for the missing packages.
pub struct InstallerLauncher<'a> {
    archive: &'a ResourceArchive,
    packages: &'a dyn PackageManager,
    interpreter: &'a Interpreter,
    policy: SpawnPolicy,
    source: InstallerSource,
    options: LaunchOptions,
}

impl<'a> InstallerLauncher<'a> {
    pub fn new(
        archive: &'a ResourceArchive,
        packages: &'a dyn PackageManager,
        interpreter: &'a Interpreter,
        policy: SpawnPolicy,
        source: InstallerSource,
        options: LaunchOptions,
    ) -> Self {
        Self {
            archive,
            packages,
            interpreter,
            policy,
            source,
            options,
        }
    }

    fn run_installer(&self, missing: &[String]) -> Result<i32> {
        let staging = StagingDirectory::create(self.options.staging_parent.as_deref())?;
        let installer = staging.stage_installer(&self.source, self.archive)?;

        if self.policy.stages_terminal_extension() {
            if let Err(err) = network::probe(&self.options.probe_url, self.options.probe_timeout) {
                eprintln!("{err}");
                return Ok(OFFLINE_STATUS);
            }

            // Only a script installer runs on the interpreter's curses.
            if installer.via_interpreter {
                let info = self.interpreter.query(self.policy)?;
                staging.stage_terminal_extension(
                    self.archive,
                    &info,
                    &self.options.extension_index_url,
                    self.options.extension_timeout,
                )?;
            }
        }

        let mut command = installer.command(self.interpreter);
        command.args(missing);
        self.policy.interactive(&mut command);

        tracing::info!(installer = %installer.path.display(), "spawning installer");
        let status = command
            .status()
            .with_context(|| format!("failed to run {}", installer.path.display()))?;

        let code = exit_code(status);
        tracing::info!(code, "installer finished");
        Ok(code)
    }
}

impl DependencyInstaller for InstallerLauncher<'_> {
    fn ensure_installed(&self, requirements: &[String]) -> Result<i32> {
        let missing = DependencyChecker::new(self.packages).missing(requirements)?;
        if missing.is_empty() {
            tracing::debug!("all requirements satisfied");
            return Ok(0);
        }

        tracing::info!(?missing, "missing packages");
        self.run_installer(&missing)
    }
}
