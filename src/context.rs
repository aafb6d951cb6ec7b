//! Application-level flags shared by the control loop, dispatcher and display

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::state::MAX_STRIKES;

/// Mutable operator-facing state that lives outside the state machine
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Ask the vision collaborator to require eyes
    pub eyes: bool,
    /// Ask the vision collaborator to require a grin
    pub grin: bool,
    /// Strikes shown on the display
    pub strikes: u8,
    /// Last scripted phrase spoken, used as the recognition target
    pub phrase: String,
    /// Set once the current exchange ran out of strikes
    pub failed: bool,
    /// Simulated "face in view" switch read by the manual vision source
    pub presence: Arc<AtomicBool>,
}

impl Context {
    pub fn new(eyes: bool, grin: bool) -> Self {
        Self {
            eyes,
            grin,
            ..Self::default()
        }
    }

    /// Strike marks, e.g. `XX-` after two strikes
    pub fn strike_marks(&self) -> String {
        let shown = self.strikes.min(MAX_STRIKES) as usize;
        let mut marks = "X".repeat(shown);
        marks.push_str(&"-".repeat(MAX_STRIKES as usize - shown));
        marks
    }

    /// Flip the simulated presence switch and return the new value
    pub fn toggle_presence(&self) -> bool {
        !self.presence.fetch_xor(true, Ordering::SeqCst)
    }
}
