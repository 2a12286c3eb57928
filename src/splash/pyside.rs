use std::io::Write;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::{Icon, Splash, SplashFactory, Toolkit, ToolkitProbe};
use crate::bootstrap::{Interpreter, SpawnPolicy};
use crate::error::LaunchError;

/// Shows a 400x200 frameless window with one centered label until killed.
/// argv: toolkit module, text, optional icon path.
const SPLASH_SCRIPT: &str = r#"
import importlib, sys
qt = sys.argv[1]
core = importlib.import_module(qt + ".QtCore")
gui = importlib.import_module(qt + ".QtGui")
widgets = importlib.import_module(qt + ".QtWidgets")
app = widgets.QApplication(sys.argv[:1])
if len(sys.argv) > 3:
    app.setWindowIcon(gui.QIcon(sys.argv[3]))
splash = widgets.QSplashScreen()
size = app.primaryScreen().availableGeometry().size()
splash.setGeometry(size.width() // 2 - 200, size.height() // 2 - 100, 400, 200)
splash.setFixedSize(400, 200)
layout = widgets.QVBoxLayout(splash)
label = widgets.QLabel(sys.argv[2])
label.setAlignment(core.Qt.AlignCenter)
label.setStyleSheet("font-size: 30px")
layout.addWidget(label)
splash.show()
sys.exit(app.exec())
"#;

/// Qt bindings (PySide6 by default) reached through the program's interpreter.
#[derive(Debug, Clone)]
pub struct PySideToolkit {
    interpreter: Interpreter,
    policy: SpawnPolicy,
    module: String,
}

impl PySideToolkit {
    pub fn new(interpreter: Interpreter, policy: SpawnPolicy, module: impl Into<String>) -> Self {
        Self {
            interpreter,
            policy,
            module: module.into(),
        }
    }

    fn import_command(&self) -> Command {
        let mut command = self.interpreter.command();
        command
            .arg("-c")
            .arg(format!("import {}.QtWidgets", self.module))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        self.policy.background(&mut command);
        command
    }

    fn importable(&self) -> bool {
        match self.import_command().status() {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!("cannot run {}: {err}", self.interpreter);
                false
            }
        }
    }

    fn factory(&self) -> PySideFactory {
        PySideFactory {
            toolkit: self.clone(),
        }
    }
}

impl ToolkitProbe for PySideToolkit {
    fn probe(&self) -> Toolkit {
        if self.importable() {
            Toolkit::Available(Box::new(self.factory()))
        } else {
            tracing::info!(module = %self.module, "splash toolkit not installed yet");
            Toolkit::Unavailable
        }
    }

    fn load(&self) -> Result<Box<dyn SplashFactory>> {
        if !self.importable() {
            return Err(LaunchError::ToolkitUnavailable(self.module.clone()).into());
        }
        Ok(Box::new(self.factory()))
    }
}

pub struct PySideFactory {
    toolkit: PySideToolkit,
}

impl PySideFactory {
    fn splash(&self, text: &str, icon: Option<&Icon>) -> Result<PySideSplash> {
        let icon_file = icon.map(write_icon).transpose()?;

        let mut command = self.toolkit.interpreter.command();
        command
            .args(["-c", SPLASH_SCRIPT, &self.toolkit.module, text])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(file) = &icon_file {
            command.arg(file.path());
        }
        self.toolkit.policy.background(&mut command);

        Ok(PySideSplash {
            command,
            child: None,
            _icon: icon_file,
        })
    }
}

impl SplashFactory for PySideFactory {
    fn open(&self, text: &str, icon: Option<&Icon>) -> Result<Box<dyn Splash>> {
        Ok(Box::new(self.splash(text, icon)?))
    }
}

fn write_icon(icon: &Icon) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("preflight-logo-")
        .suffix(&format!(".{}", icon.extension))
        .tempfile()
        .context("cannot create icon file")?;
    file.write_all(&icon.bytes).context("cannot write icon file")?;
    Ok(file)
}

/// The splash window process. Showing spawns it, hiding kills it.
pub struct PySideSplash {
    command: Command,
    child: Option<Child>,
    // Deleted once the window is gone.
    _icon: Option<NamedTempFile>,
}

impl Splash for PySideSplash {
    fn show(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = self
            .command
            .spawn()
            .context("failed to start splash window")?;
        tracing::debug!(pid = child.id(), "splash shown");
        self.child = Some(child);
        Ok(())
    }

    fn hide(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(err) = child.kill() {
            tracing::debug!("splash already gone: {err}");
        }
        let _ = child.wait();
        tracing::debug!("splash hidden");
    }
}

impl Drop for PySideSplash {
    fn drop(&mut self) {
        self.hide();
    }
}
