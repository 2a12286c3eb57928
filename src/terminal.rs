//! Raw-mode / alternate-screen handling for the installer screen.

use std::io;

use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};

/// A terminal state that is entered once and must be left again.
pub trait TerminalMode {
    fn enter(&mut self) -> io::Result<()>;
    fn restore(&mut self) -> io::Result<()>;
}

/// Raw mode plus the alternate screen on stdout.
#[derive(Debug, Default)]
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        let raw = disable_raw_mode();
        let mut stdout = io::stdout();
        let screen = execute!(stdout, LeaveAlternateScreen, Show);
        raw.and(screen)
    }
}

/// Holds a [`TerminalMode`] entered; restores it on [`finish`](Self::finish)
/// or, failing that, on drop (errors and panics included).
pub struct TerminalSession<'a, M: TerminalMode> {
    mode: &'a mut M,
    active: bool,
}

impl<'a, M: TerminalMode> TerminalSession<'a, M> {
    pub fn enter(mode: &'a mut M) -> io::Result<Self> {
        mode.enter()?;
        Ok(Self { mode, active: true })
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.active = false;
        self.mode.restore()
    }
}

impl<M: TerminalMode> Drop for TerminalSession<'_, M> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(err) = self.mode.restore() {
                tracing::error!("failed to restore terminal: {err}");
            }
        }
    }
}

/// Run `f` with the terminal in `mode`; normal mode is restored exactly once
/// however `f` ends.
pub fn with_terminal_mode<M, T, F>(mode: &mut M, f: F) -> Result<T>
where
    M: TerminalMode,
    F: FnOnce() -> Result<T>,
{
    let session = TerminalSession::enter(mode)?;
    let result = f();
    let restored = session.finish();
    let value = result?;
    restored?;
    Ok(value)
}
