/// Installer screen states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for `y`/`n`. `retry` is set after any other key.
    AwaitConfirm { retry: bool },
    /// The install command is running.
    Installing,
    /// Finished; the process exits with this status.
    Done(i32),
}

impl Default for Stage {
    fn default() -> Self {
        Self::AwaitConfirm { retry: false }
    }
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::AwaitConfirm { .. } => "CONFIRM",
            Stage::Installing => "INSTALLING",
            Stage::Done(0) => "DONE",
            Stage::Done(_) => "ABORTED",
        }
    }
}
