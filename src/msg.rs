use crossterm::event::KeyEvent;

/// All possible messages that drive installer state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- System
    /// Fired every poll interval without input.
    Tick,
}
