//! Operator key definitions
//!
//! Maps terminal key events to the commands the control loop understands. Only
//! `g`, `h` and `L` reach the state machine; everything else is handled by
//! the control loop directly.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::events::Key;

/// What an operator key press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Forwarded to the state machine on the next tick
    Machine(Key),
    /// Toggle eye detection
    ToggleEyes,
    /// Toggle smile detection
    ToggleGrin,
    /// Toggle the simulated "face in view" switch
    TogglePresence,
    /// Say the next phrase (only while no exchange runs)
    SayTest,
    /// Recognize the last spoken phrase (only while no exchange runs)
    HearTest,
    /// Switch the external output on briefly
    PulseRelay,
    /// Print the key help
    Help,
    /// Leave the control loop
    Quit,
}

impl KeyCommand {
    /// Decode a terminal key event
    ///
    /// Only presses count. Raw mode swallows SIGINT, so Ctrl-C quits too.
    pub fn from_key(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match event.code {
            KeyCode::Esc => Some(KeyCommand::Quit),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyCommand::Quit)
            }
            KeyCode::Char(_) if event.modifiers.contains(KeyModifiers::CONTROL) => None,
            KeyCode::Char(c) => Self::from_char(c),
            _ => None,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        let command = match c {
            'Q' => KeyCommand::Quit,
            '1' => KeyCommand::ToggleEyes,
            '2' => KeyCommand::ToggleGrin,
            'f' => KeyCommand::TogglePresence,
            'g' => KeyCommand::Machine(Key::Go),
            'h' => KeyCommand::Machine(Key::Halt),
            'L' => KeyCommand::Machine(Key::Listen),
            's' => KeyCommand::SayTest,
            'r' => KeyCommand::HearTest,
            'Z' => KeyCommand::PulseRelay,
            '?' => KeyCommand::Help,
            _ => return None,
        };
        Some(command)
    }
}

/// Key help, one line per key
pub const HELP: &[&str] = &[
    "? - Display help.",
    "1 - Toggle eye detection.",
    "2 - Toggle smile detection.",
    "f - Toggle simulated face presence.",
    "g - Go. Restarts monitoring.",
    "h - Halt. Stops monitoring and any external action.",
    "L - Start scripted speech mode. Only valid when monitoring.",
    "s - (Test) Say next phrase from file.",
    "r - (Test) Recognize phrase that was last spoken.",
    "Z - (Test) Activate external output briefly.",
    "Q - Quit.",
    "ESC or Ctrl-C - Quit.",
];
