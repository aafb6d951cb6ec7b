//! Worker message protocol definitions
//!
//! Commands are a verb plus one argument, written as a single text line.
//! Workers answer on the shared inbox with a topic tag and a list of tokens;
//! the tokens are parsed once here into a typed [`Report`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::Event;

/// Which worker a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Speech output (text to speech)
    Speech,
    /// Speech recognition
    Recognition,
    /// Serial hardware I/O
    Hardware,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Speech => write!(f, "TTS"),
            Topic::Recognition => write!(f, "REC"),
            Topic::Hardware => write!(f, "COM"),
        }
    }
}

/// A single command for one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub verb: String,
    pub argument: String,
}

impl WorkerCommand {
    pub fn new(verb: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            argument: argument.into(),
        }
    }

    /// Speak `text`
    pub fn say(text: impl Into<String>) -> Self {
        Self::new("say", text)
    }

    /// Listen for `phrase`
    pub fn hear(phrase: impl Into<String>) -> Self {
        Self::new("hear", phrase)
    }

    /// Configure digital pin 0: `true` for output, `false` for input
    pub fn pin_output(output: bool) -> Self {
        Self::new("dig0_cfg", if output { "0" } else { "1" })
    }

    /// Drive digital pin 0 high or low
    pub fn pin_write(high: bool) -> Self {
        Self::new("dig0_io", if high { "1" } else { "0" })
    }
}

impl std::fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb, self.argument)
    }
}

/// Raw result posted by a worker onto the shared inbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMessage {
    pub topic: Topic,
    pub tokens: Vec<String>,
}

impl WorkerMessage {
    pub fn new(topic: Topic, tokens: Vec<String>) -> Self {
        Self { topic, tokens }
    }
}

impl std::fmt::Display for WorkerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.topic)?;
        for token in &self.tokens {
            write!(f, " {}", token)?;
        }
        Ok(())
    }
}

/// Typed view of a [`WorkerMessage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Speech output finished
    SpeechDone,
    /// Recognizer start-up result
    RecognitionReady { ok: bool, detail: String },
    /// Recognizer finished listening
    Recognized { matched: bool },
    /// Free-form status line from the hardware link
    HardwareStatus { line: String },
    /// Tokens that fit no known schema
    Malformed(WorkerMessage),
}

impl Report {
    /// Parse a raw worker message
    pub fn parse(message: &WorkerMessage) -> Self {
        let tokens = &message.tokens;
        match message.topic {
            Topic::Speech => Report::SpeechDone,
            Topic::Recognition => match tokens.first().map(String::as_str) {
                Some("init") => match tokens.get(1).and_then(|t| parse_flag(t)) {
                    Some(ok) => Report::RecognitionReady {
                        ok,
                        detail: tokens[2..].join(" "),
                    },
                    None => Report::Malformed(message.clone()),
                },
                Some(token) => match parse_flag(token) {
                    Some(matched) => Report::Recognized { matched },
                    None => Report::Malformed(message.clone()),
                },
                None => Report::Malformed(message.clone()),
            },
            Topic::Hardware => Report::HardwareStatus {
                line: tokens.join(" "),
            },
        }
    }

    /// Translate into a state machine event
    ///
    /// `exchange_idle` tells whether any exchange is waiting on a worker.
    /// Results nobody is waiting for are logged and dropped.
    pub fn into_event(self, exchange_idle: bool) -> Option<Event> {
        match self {
            Report::SpeechDone if exchange_idle => {
                debug!("speech finished with no exchange active");
                None
            }
            Report::SpeechDone => Some(Event::SpeechFinished),
            Report::RecognitionReady { ok, detail } => {
                if ok {
                    info!(%detail, "speech recognition ready");
                } else {
                    warn!(%detail, "speech recognition unavailable");
                }
                None
            }
            Report::Recognized { matched } if exchange_idle => {
                info!(matched, "recognition test result");
                None
            }
            Report::Recognized { matched } => Some(Event::RecognitionResult { matched }),
            Report::HardwareStatus { line } => {
                info!(%line, "hardware status");
                Some(Event::HardwareAck)
            }
            Report::Malformed(message) => {
                warn!(%message, "unrecognized worker message dropped");
                None
            }
        }
    }
}

/// Boolean tokens as the workers print them
fn parse_flag(token: &str) -> Option<bool> {
    match token {
        "True" | "true" | "1" => Some(true),
        "False" | "false" | "0" => Some(false),
        _ => None,
    }
}
