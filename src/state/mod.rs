//! State machine module for the kiosk interaction
//!
//! Provides a two-level state machine:
//! - Lifecycle: Halted / Monitoring, driven by operator keys
//! - Exchange: Idle, Speaking, Listening, Ack, Success, Failed, driven by
//!   face detection, worker completions and the recognition timer

mod exchange;
mod machine;
mod snapshot;
mod timer;

pub use exchange::{ExchangeState, MAX_STRIKES};
pub use machine::{Lifecycle, StateMachine};
pub use snapshot::{Color, Snapshot};
pub use timer::RecognitionTimer;
