//! Calling into the launched program once it is ready to run.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;

use crate::bootstrap::spawn::exit_code;
use crate::bootstrap::{Interpreter, SpawnPolicy};

/// argv: search path, module, function, then JSON-encoded extra arguments.
/// An integer return value becomes the exit status.
const RUN_SCRIPT: &str = r#"
import importlib, json, sys
root, module, func = sys.argv[1:4]
extra = [json.loads(arg) for arg in sys.argv[4:]]
sys.path.insert(0, root)
sys.argv = [root]
result = getattr(importlib.import_module(module), func)(*extra)
sys.exit(result if isinstance(result, int) else 0)
"#;

/// argv: search path, module, hook. Prints the hook's result as JSON on the
/// last line of stdout.
const HOOK_SCRIPT: &str = r#"
import importlib, json, sys
root, module, func = sys.argv[1:4]
sys.path.insert(0, root)
result = getattr(importlib.import_module(module), func)()
print()
print(json.dumps(result, default=str))
"#;

pub trait EntryPoint {
    /// Run a preparation hook from the main module and return its result.
    fn call_hook(&self, name: &str) -> Result<Value>;

    /// Run the main function, passing `extra` when present. Returns the
    /// program's exit status.
    fn invoke(&self, extra: Option<&Value>) -> Result<i32>;
}

/// `module.function` inside the program, run by the Python interpreter with
/// the program root (a directory or the `.pyz` itself) on `sys.path`.
#[derive(Debug, Clone)]
pub struct PythonEntry {
    interpreter: Interpreter,
    policy: SpawnPolicy,
    search_path: PathBuf,
    module: String,
    function: String,
}

impl PythonEntry {
    pub fn new(
        interpreter: Interpreter,
        policy: SpawnPolicy,
        search_path: impl Into<PathBuf>,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            interpreter,
            policy,
            search_path: search_path.into(),
            module: module.into(),
            function: function.into(),
        }
    }

    fn script_command(&self, script: &str, function: &str) -> Command {
        let mut command = self.interpreter.command();
        command
            .args(["-c", script])
            .arg(&self.search_path)
            .args([self.module.as_str(), function]);
        command
    }

    fn run_command(&self, extra: Option<&Value>) -> Command {
        let mut command = self.script_command(RUN_SCRIPT, &self.function);
        if let Some(value) = extra {
            command.arg(value.to_string());
        }
        command
    }

    fn hook_command(&self, name: &str) -> Command {
        let mut command = self.script_command(HOOK_SCRIPT, name);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        self.policy.background(&mut command);
        command
    }
}

impl EntryPoint for PythonEntry {
    fn call_hook(&self, name: &str) -> Result<Value> {
        tracing::info!(module = %self.module, hook = name, "running pre-main hook");
        let output = self
            .hook_command(name)
            .output()
            .with_context(|| format!("failed to run {}.{name}", self.module))?;
        if !output.status.success() {
            bail!(
                "{}.{name} failed with status {}",
                self.module,
                exit_code(output.status)
            );
        }
        parse_hook_output(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("{}.{name} returned no usable result", self.module))
    }

    fn invoke(&self, extra: Option<&Value>) -> Result<i32> {
        tracing::info!(module = %self.module, function = %self.function, "starting program");
        let status = self
            .run_command(extra)
            .status()
            .with_context(|| format!("failed to run {}.{}", self.module, self.function))?;
        Ok(exit_code(status))
    }
}

/// The hook's JSON is the last non-empty line; anything the hook printed
/// before it is ignored.
fn parse_hook_output(stdout: &str) -> Result<Value> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| anyhow!("no output"))?;
    Ok(serde_json::from_str(line.trim())?)
}
