use std::fmt;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

use super::spawn::SpawnPolicy;
use crate::error::LaunchError;

const QUERY_SCRIPT: &str =
    "import struct, sys; print(*sys.version_info[:3], struct.calcsize('P') * 8)";

/// The Python interpreter the launched program runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    program: String,
}

impl Interpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::new("py")
        } else {
            Self::new("python3")
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// Ask the interpreter for its version and pointer width.
    pub fn query(&self, policy: SpawnPolicy) -> Result<InterpreterInfo> {
        let mut command = self.command();
        command
            .args(["-c", QUERY_SCRIPT])
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        policy.background(&mut command);

        let output = command
            .output()
            .with_context(|| format!("failed to run python interpreter `{self}`"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        InterpreterInfo::parse(&stdout)
            .ok_or_else(|| anyhow!("unexpected interpreter version output: {}", stdout.trim()))
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub version: [u32; 3],
    pub pointer_width: u32,
}

impl InterpreterInfo {
    /// Parse `"<major> <minor> <micro> <bits>"`.
    pub fn parse(output: &str) -> Option<Self> {
        let mut fields = output.split_whitespace().map(|field| field.parse::<u32>().ok());
        let major = fields.next()??;
        let minor = fields.next()??;
        let micro = fields.next()??;
        let pointer_width = fields.next()??;
        Some(Self {
            version: [major, minor, micro],
            pointer_width,
        })
    }

    pub fn major(&self) -> u32 {
        self.version[0]
    }

    pub fn minor(&self) -> u32 {
        self.version[1]
    }

    pub fn is_64bit(&self) -> bool {
        self.pointer_width == 64
    }

    /// Fails when the interpreter is older than `minimum` (e.g. `[3, 7]`).
    /// Only as many components as `minimum` has are compared.
    pub fn ensure_at_least(&self, minimum: &[u32]) -> Result<(), LaunchError> {
        let len = minimum.len().min(self.version.len());
        if self.version[..len] < minimum[..len] {
            return Err(LaunchError::InterpreterTooOld {
                required: join_version(minimum),
                found: join_version(&self.version),
            });
        }
        Ok(())
    }
}

impl fmt::Display for InterpreterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}-bit)", join_version(&self.version), self.pointer_width)
    }
}

fn join_version(parts: &[u32]) -> String {
    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
