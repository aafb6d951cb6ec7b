//! Speech output engine
//!
//! Speaks by running an external text-to-speech program with the text as its
//! final argument (e.g. `espeak` or `say`). Completion is a bare "done"
//! message whether or not the program succeeded.

use std::process::{Command, Stdio};

use tracing::{info, warn};

use super::protocol::{Topic, WorkerCommand};
use super::proxy::Engine;

/// Text-to-speech through an external program
#[derive(Debug, Clone, Default)]
pub struct CommandSpeaker {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// `program` of `None` only logs the text
    pub fn new(program: Option<String>, args: Vec<String>) -> Self {
        Self { program, args }
    }

    fn speak(&self, text: &str) {
        let Some(program) = &self.program else {
            info!(%text, "SAY (no speech program configured)");
            return;
        };

        let status = Command::new(program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => info!(%text, "SAY"),
            Ok(status) => warn!(%program, ?status, "speech program failed"),
            Err(e) => warn!(%program, ?e, "failed to run speech program"),
        }
    }
}

impl Engine for CommandSpeaker {
    fn topic(&self) -> Topic {
        Topic::Speech
    }

    fn execute(&mut self, command: &WorkerCommand) -> Option<Vec<String>> {
        match command.verb.as_str() {
            "say" => self.speak(&command.argument),
            other => warn!(verb = other, "unknown speech command"),
        }
        Some(Vec::new())
    }
}
