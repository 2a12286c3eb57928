//! The launch sequence: version check, dependency install, optional splash,
//! then the program itself.

use anyhow::Result;

use crate::bootstrap::{DependencyInstaller, InterpreterInfo};
use crate::entry::EntryPoint;
use crate::model::launch::{Flow, LaunchConfig};
use crate::resource::ResourceArchive;
use crate::splash::{Icon, SplashFactory, SplashGuard, Toolkit, ToolkitProbe, find_icon};

/// Status returned when the interpreter is older than `min_py_ver`.
pub const ENVIRONMENT_STATUS: i32 = 1;

pub struct Sequencer<'a> {
    archive: &'a ResourceArchive,
    installer: &'a dyn DependencyInstaller,
    entry: &'a dyn EntryPoint,
    toolkit: &'a dyn ToolkitProbe,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        archive: &'a ResourceArchive,
        installer: &'a dyn DependencyInstaller,
        entry: &'a dyn EntryPoint,
        toolkit: &'a dyn ToolkitProbe,
    ) -> Self {
        Self {
            archive,
            installer,
            entry,
            toolkit,
        }
    }

    /// Run the whole sequence and return the process exit status.
    pub fn run(&self, config: &LaunchConfig, interpreter: &InterpreterInfo) -> Result<i32> {
        if let Err(err) = interpreter.ensure_at_least(&config.min_py_ver) {
            tracing::error!("{err}");
            eprintln!("{err}");
            return Ok(ENVIRONMENT_STATUS);
        }

        let requirements = config.requirements(self.archive)?;
        match config.flow() {
            Flow::Plain => self.run_plain(&requirements),
            Flow::Splash { text } => {
                self.run_with_splash(&requirements, &text, config.pre_main.as_deref())
            }
        }
    }

    fn run_plain(&self, requirements: &[String]) -> Result<i32> {
        let status = self.installer.ensure_installed(requirements)?;
        if status != 0 {
            tracing::warn!(status, "installation did not complete");
            return Ok(status);
        }
        self.entry.invoke(None)
    }

    /// With the toolkit already installed the splash covers the install;
    /// otherwise it can only appear once the install brought the toolkit in.
    fn run_with_splash(
        &self,
        requirements: &[String],
        text: &str,
        pre_main: Option<&str>,
    ) -> Result<i32> {
        let icon = find_icon(self.archive)?;

        let toolkit = self.toolkit.probe();
        let toolkit_ready = toolkit.is_available();
        let mut splash = match toolkit {
            Toolkit::Available(factory) => open_splash(factory.as_ref(), text, icon.as_ref()),
            Toolkit::Unavailable => None,
        };

        let status = self.installer.ensure_installed(requirements)?;
        if status != 0 {
            tracing::warn!(status, "installation did not complete");
            return Ok(status);
        }

        if !toolkit_ready {
            match self.toolkit.load() {
                Ok(factory) => splash = open_splash(factory.as_ref(), text, icon.as_ref()),
                Err(err) => tracing::warn!("continuing without splash: {err:#}"),
            }
        }

        let extra = pre_main
            .map(|hook| self.entry.call_hook(hook))
            .transpose()?;

        if let Some(guard) = splash.as_mut() {
            guard.hide();
        }
        self.entry.invoke(extra.as_ref())
    }
}

fn open_splash(
    factory: &dyn SplashFactory,
    text: &str,
    icon: Option<&Icon>,
) -> Option<SplashGuard> {
    match factory.open(text, icon).and_then(SplashGuard::show) {
        Ok(guard) => Some(guard),
        Err(err) => {
            tracing::warn!("cannot show splash: {err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splash::tests::{Events, FakeProbe};
    use anyhow::bail;
    use serde_json::{Value, json};
    use std::fs;

    struct FakeInstaller {
        status: i32,
        events: Events,
    }

    impl DependencyInstaller for FakeInstaller {
        fn ensure_installed(&self, requirements: &[String]) -> Result<i32> {
            self.events
                .borrow_mut()
                .push(format!("install {}", requirements.join(",")));
            Ok(self.status)
        }
    }

    struct FakeEntry {
        hook_result: Value,
        events: Events,
    }

    impl EntryPoint for FakeEntry {
        fn call_hook(&self, name: &str) -> Result<Value> {
            self.events.borrow_mut().push(format!("hook {name}"));
            Ok(self.hook_result.clone())
        }

        fn invoke(&self, extra: Option<&Value>) -> Result<i32> {
            let extra = extra.map_or("-".to_string(), Value::to_string);
            self.events.borrow_mut().push(format!("invoke {extra}"));
            Ok(0)
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        archive: ResourceArchive,
        events: Events,
    }

    impl Harness {
        fn new(requirements: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("requirements.txt"), requirements).unwrap();
            let archive = ResourceArchive::locate(dir.path()).unwrap();
            Self {
                _dir: dir,
                archive,
                events: Events::default(),
            }
        }

        fn run(&self, config: &LaunchConfig, status: i32, toolkit_ready: bool) -> Result<i32> {
            let installer = FakeInstaller {
                status,
                events: self.events.clone(),
            };
            let entry = FakeEntry {
                hook_result: json!({"prepared": true}),
                events: self.events.clone(),
            };
            let probe = FakeProbe {
                ready: toolkit_ready,
                events: self.events.clone(),
            };
            let info = InterpreterInfo {
                version: [3, 11, 4],
                pointer_width: 64,
            };
            Sequencer::new(&self.archive, &installer, &entry, &probe).run(config, &info)
        }

        fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }
    }

    fn splash_config(pre_main: Option<&str>) -> LaunchConfig {
        LaunchConfig {
            splash: Some("Loading".into()),
            pre_main: pre_main.map(str::to_string),
            ..LaunchConfig::default()
        }
    }

    #[test]
    fn plain_flow_installs_then_runs() {
        let harness = Harness::new("alpha\nbeta\n");
        let status = harness.run(&LaunchConfig::default(), 0, false).unwrap();

        assert_eq!(status, 0);
        assert_eq!(harness.events(), vec!["install alpha,beta", "invoke -"]);
    }

    #[test]
    fn plain_flow_passes_installer_status_through() {
        let harness = Harness::new("alpha\n");
        let status = harness.run(&LaunchConfig::default(), 7, false).unwrap();

        assert_eq!(status, 7);
        assert_eq!(harness.events(), vec!["install alpha"]);
    }

    #[test]
    fn old_interpreter_stops_before_reading_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ResourceArchive::locate(dir.path()).unwrap();
        let events = Events::default();
        let installer = FakeInstaller {
            status: 0,
            events: events.clone(),
        };
        let entry = FakeEntry {
            hook_result: Value::Null,
            events: events.clone(),
        };
        let probe = FakeProbe {
            ready: true,
            events: events.clone(),
        };
        let config = LaunchConfig {
            min_py_ver: vec![3, 12],
            ..LaunchConfig::default()
        };
        let info = InterpreterInfo {
            version: [3, 8, 10],
            pointer_width: 64,
        };

        // No requirements.txt exists, so reading it would fail.
        let status = Sequencer::new(&archive, &installer, &entry, &probe)
            .run(&config, &info)
            .unwrap();

        assert_eq!(status, ENVIRONMENT_STATUS);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn missing_requirement_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness {
            archive: ResourceArchive::locate(dir.path()).unwrap(),
            _dir: dir,
            events: Events::default(),
        };
        assert!(harness.run(&LaunchConfig::default(), 0, true).is_err());
        assert!(harness.events().is_empty());
    }

    #[test]
    fn ready_toolkit_shows_splash_during_install() {
        let harness = Harness::new("PySide6\n");
        let status = harness.run(&splash_config(None), 0, true).unwrap();

        assert_eq!(status, 0);
        assert_eq!(
            harness.events(),
            vec![
                "probe",
                "open Loading",
                "show",
                "install PySide6",
                "hide",
                "invoke -"
            ]
        );
    }

    #[test]
    fn missing_toolkit_shows_splash_after_install() {
        let harness = Harness::new("PySide6\n");
        harness.run(&splash_config(None), 0, false).unwrap();

        assert_eq!(
            harness.events(),
            vec![
                "probe",
                "install PySide6",
                "load",
                "open Loading",
                "show",
                "hide",
                "invoke -"
            ]
        );
    }

    #[test]
    fn pre_main_result_reaches_the_program() {
        let harness = Harness::new("PySide6\n");
        harness.run(&splash_config(Some("prepare")), 0, true).unwrap();

        let events = harness.events();
        assert_eq!(
            events[events.len() - 3..],
            ["hook prepare", "hide", r#"invoke {"prepared":true}"#]
        );
    }

    #[test]
    fn failed_install_hides_splash_and_skips_program() {
        let harness = Harness::new("PySide6\n");
        let status = harness.run(&splash_config(Some("prepare")), 2, true).unwrap();

        assert_eq!(status, 2);
        assert_eq!(
            harness.events(),
            vec!["probe", "open Loading", "show", "install PySide6", "hide"]
        );
    }

    #[test]
    fn failed_install_without_toolkit_never_opens_splash() {
        let harness = Harness::new("PySide6\n");
        let status = harness.run(&splash_config(None), 1, false).unwrap();

        assert_eq!(status, 1);
        assert_eq!(harness.events(), vec!["probe", "install PySide6"]);
    }

    #[test]
    fn toolkit_still_missing_after_install_runs_without_splash() {
        struct NeverReady;
        impl ToolkitProbe for NeverReady {
            fn probe(&self) -> Toolkit {
                Toolkit::Unavailable
            }
            fn load(&self) -> Result<Box<dyn SplashFactory>> {
                bail!("PySide6 still missing")
            }
        }

        let harness = Harness::new("PySide6\n");
        let installer = FakeInstaller {
            status: 0,
            events: harness.events.clone(),
        };
        let entry = FakeEntry {
            hook_result: Value::Null,
            events: harness.events.clone(),
        };
        let info = InterpreterInfo {
            version: [3, 11, 0],
            pointer_width: 64,
        };

        let status = Sequencer::new(&harness.archive, &installer, &entry, &NeverReady)
            .run(&splash_config(None), &info)
            .unwrap();

        assert_eq!(status, 0);
        assert_eq!(harness.events(), vec!["install PySide6", "invoke -"]);
    }
}
