use std::fs::File;
use std::path::Path;
use std::process::{Child, Stdio};

use anyhow::{Context, Result};

use super::interpreter::Interpreter;
use super::spawn::{SpawnPolicy, exit_code};

/// The external package manager the launcher delegates to.
pub trait PackageManager {
    /// Raw "list installed packages" output.
    fn list_installed(&self) -> Result<String>;

    /// Start installing `names` without waiting for it to finish.
    fn install(&self, names: &[String], log: Option<&Path>) -> Result<Box<dyn InstallProcess>>;
}

/// A running install command that can be polled without blocking.
pub trait InstallProcess {
    /// `Some(status)` once the command has exited.
    fn poll(&mut self) -> Result<Option<i32>>;
}

impl InstallProcess for Child {
    fn poll(&mut self) -> Result<Option<i32>> {
        Ok(self.try_wait()?.map(exit_code))
    }
}

/// `pip`, driven through `<python> -m pip`.
#[derive(Debug, Clone)]
pub struct Pip {
    interpreter: Interpreter,
    policy: SpawnPolicy,
}

impl Pip {
    pub fn new(interpreter: Interpreter, policy: SpawnPolicy) -> Self {
        Self {
            interpreter,
            policy,
        }
    }
}

impl PackageManager for Pip {
    fn list_installed(&self) -> Result<String> {
        let mut command = self.interpreter.command();
        command.args(["-m", "pip", "list"]).stdin(Stdio::null());
        self.policy.background(&mut command);

        let output = command
            .output()
            .with_context(|| format!("failed to run `{} -m pip list`", self.interpreter))?;

        if !output.status.success() {
            tracing::warn!(
                status = ?output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "pip list failed"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn install(&self, names: &[String], log: Option<&Path>) -> Result<Box<dyn InstallProcess>> {
        let mut command = self.interpreter.command();
        command
            .args(["-m", "pip", "install"])
            .args(names)
            .stdin(Stdio::null());

        match log {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                command.stdout(file.try_clone()?).stderr(file);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        self.policy.background(&mut command);

        tracing::info!(packages = ?names, "starting pip install");
        let child = command
            .spawn()
            .with_context(|| format!("failed to run `{} -m pip install`", self.interpreter))?;
        Ok(Box::new(child))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Exits with `status` after being polled `running_polls` times.
    pub(crate) struct FakeProcess {
        running_polls: usize,
        status: i32,
        polls: Rc<Cell<usize>>,
    }

    impl InstallProcess for FakeProcess {
        fn poll(&mut self) -> Result<Option<i32>> {
            self.polls.set(self.polls.get() + 1);
            if self.running_polls == 0 {
                Ok(Some(self.status))
            } else {
                self.running_polls -= 1;
                Ok(None)
            }
        }
    }

    pub(crate) struct FakePackages {
        listing: String,
        list_calls: Cell<usize>,
        pub(crate) installs: RefCell<Vec<Vec<String>>>,
        running_polls: usize,
        status: i32,
        pub(crate) polls: Rc<Cell<usize>>,
    }

    impl FakePackages {
        pub(crate) fn new(listing: &str) -> Self {
            Self {
                listing: listing.to_string(),
                list_calls: Cell::new(0),
                installs: RefCell::new(Vec::new()),
                running_polls: 0,
                status: 0,
                polls: Rc::new(Cell::new(0)),
            }
        }

        pub(crate) fn with_install(mut self, running_polls: usize, status: i32) -> Self {
            self.running_polls = running_polls;
            self.status = status;
            self
        }

        pub(crate) fn list_calls(&self) -> usize {
            self.list_calls.get()
        }
    }

    impl PackageManager for FakePackages {
        fn list_installed(&self) -> Result<String> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self.listing.clone())
        }

        fn install(
            &self,
            names: &[String],
            _log: Option<&Path>,
        ) -> Result<Box<dyn InstallProcess>> {
            self.installs.borrow_mut().push(names.to_vec());
            Ok(Box::new(FakeProcess {
                running_polls: self.running_polls,
                status: self.status,
                polls: Rc::clone(&self.polls),
            }))
        }
    }

    #[cfg(unix)]
    #[test]
    fn child_reports_exit_status_through_poll() {
        let mut child = std::process::Command::new("sh")
            .args(["-c", "exit 4"])
            .spawn()
            .unwrap();

        let status = loop {
            if let Some(status) = child.poll().unwrap() {
                break status;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        };
        assert_eq!(status, 4);
    }
}
