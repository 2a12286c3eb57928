use std::process::{Command, ExitStatus};

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How child processes are created on this platform. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnPolicy {
    /// Windows: background commands get no console window, the interactive
    /// installer gets a console of its own, and the installer needs the
    /// native terminal extension staged next to it.
    WindowsConsole,
    /// Everything else: children inherit the launcher's terminal.
    InheritedConsole,
}

impl SpawnPolicy {
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::WindowsConsole
        } else {
            Self::InheritedConsole
        }
    }

    /// Commands whose output is captured or discarded (pip, probes, splash).
    pub fn background(self, command: &mut Command) {
        if self == Self::WindowsConsole {
            set_creation_flags(command, windows_flag(Flag::NoWindow));
        }
    }

    /// The installer child, which owns a terminal for the confirm prompt.
    pub fn interactive(self, command: &mut Command) {
        if self == Self::WindowsConsole {
            set_creation_flags(command, windows_flag(Flag::NewConsole));
        }
    }

    pub fn stages_terminal_extension(self) -> bool {
        self == Self::WindowsConsole
    }
}

/// Exit status as an integer; a child killed by a signal counts as `1`.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

enum Flag {
    NoWindow,
    NewConsole,
}

#[cfg(windows)]
fn windows_flag(flag: Flag) -> u32 {
    match flag {
        Flag::NoWindow => CREATE_NO_WINDOW,
        Flag::NewConsole => CREATE_NEW_CONSOLE,
    }
}

#[cfg(not(windows))]
fn windows_flag(_flag: Flag) -> u32 {
    0
}

#[cfg(windows)]
fn set_creation_flags(command: &mut Command, flags: u32) {
    use std::os::windows::process::CommandExt;

    command.creation_flags(flags);
}

#[cfg(not(windows))]
fn set_creation_flags(_command: &mut Command, _flags: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn non_windows_platforms_inherit_the_console() {
        let policy = SpawnPolicy::detect();
        assert_eq!(policy, SpawnPolicy::InheritedConsole);
        assert!(!policy.stages_terminal_extension());
    }

    #[test]
    fn only_windows_policy_stages_the_extension() {
        assert!(SpawnPolicy::WindowsConsole.stages_terminal_extension());
        assert!(!SpawnPolicy::InheritedConsole.stages_terminal_extension());
    }

    #[cfg(unix)]
    #[test]
    fn signal_terminated_child_maps_to_failure() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code(ExitStatus::from_raw(9)), 1);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }
}
