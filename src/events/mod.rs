//! Events module for state machine input and output
//!
//! Events flow into the state machine once per tick (vision result, worker
//! completions, timers, key presses). Actions flow out of it, in order, to the
//! dispatcher. The two vocabularies are disjoint: an action never instructs the
//! machine itself.

use serde::{Deserialize, Serialize};

/// Operator keys that the state machine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Start (or restart) monitoring
    Go,
    /// Stop monitoring and release any external output
    Halt,
    /// Manually start a speech exchange while monitoring
    Listen,
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Synthesized at the start of every tick
    Tick,

    /// Vision collaborator found a face (and eyes/grin, if enabled)
    FaceDetected,

    /// An operator key reached the machine (one tick after it was pressed)
    Key { key: Key },

    /// Speech-output worker finished saying its phrase
    SpeechFinished,

    /// Speech-recognition worker finished listening
    RecognitionResult {
        /// Whether the heard phrase matched the expected one
        matched: bool,
    },

    /// Hardware worker acknowledged a command
    HardwareAck,

    /// The recognition window elapsed without a result
    RecognitionTimeout,
}

impl Event {
    /// Shorthand for a key event
    pub fn key(key: Key) -> Self {
        Event::Key { key }
    }
}

/// Outputs of the state machine, consumed in order by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Say a fixed piece of text
    Speak { text: String },

    /// Say the next scripted phrase (and remember it as the recognition target)
    SpeakNextPhrase,

    /// Listen for the phrase that was last spoken
    BeginListening,

    /// A recognition attempt failed; `count` is the strike total so far
    AcknowledgeStrike { count: u8 },

    /// The exchange ran out of strikes
    FailAfterMaxStrikes,

    /// Drive the external output on
    HardwareOn {
        /// Attempt number (1-based) that succeeded
        attempts: u8,
    },

    /// Drive the external output off
    HardwareOff,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Tick => write!(f, "TICK"),
            Event::FaceDetected => write!(f, "FACE_DETECTED"),
            Event::Key { key } => write!(f, "KEY ({:?})", key),
            Event::SpeechFinished => write!(f, "SPEECH_FINISHED"),
            Event::RecognitionResult { matched } => {
                write!(f, "RECOGNITION_RESULT ({})", matched)
            }
            Event::HardwareAck => write!(f, "HARDWARE_ACK"),
            Event::RecognitionTimeout => write!(f, "RECOGNITION_TIMEOUT"),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Speak { text } => write!(f, "SPEAK ({})", text),
            Action::SpeakNextPhrase => write!(f, "SPEAK_NEXT_PHRASE"),
            Action::BeginListening => write!(f, "BEGIN_LISTENING"),
            Action::AcknowledgeStrike { count } => write!(f, "ACKNOWLEDGE_STRIKE ({})", count),
            Action::FailAfterMaxStrikes => write!(f, "FAIL_AFTER_MAX_STRIKES"),
            Action::HardwareOn { attempts } => write!(f, "HARDWARE_ON (attempt {})", attempts),
            Action::HardwareOff => write!(f, "HARDWARE_OFF"),
        }
    }
}
