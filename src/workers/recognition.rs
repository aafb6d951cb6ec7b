//! Speech recognition engine
//!
//! Runs an external recognizer program that listens once and prints what it
//! heard on stdout. The attempt matches when the transcript equals the
//! expected phrase after normalization (case, punctuation, spacing).

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::protocol::{Topic, WorkerCommand};
use super::proxy::Engine;

/// Speech recognition through an external program
#[derive(Debug, Clone, Default)]
pub struct CommandRecognizer {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// `program` of `None` never matches
    pub fn new(program: Option<String>, args: Vec<String>) -> Self {
        Self { program, args }
    }

    fn hear(&self, expected: &str) -> bool {
        let Some(program) = &self.program else {
            return false;
        };

        let output = Command::new(program)
            .args(&self.args)
            .arg(expected)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let heard = String::from_utf8_lossy(&output.stdout);
                let matched = normalize(&heard) == normalize(expected);
                debug!(heard = %heard.trim(), %expected, matched, "recognizer finished");
                matched
            }
            Ok(output) => {
                warn!(%program, status = ?output.status, "recognizer failed");
                false
            }
            Err(e) => {
                warn!(%program, ?e, "failed to run recognizer");
                false
            }
        }
    }
}

impl Engine for CommandRecognizer {
    fn topic(&self) -> Topic {
        Topic::Recognition
    }

    fn startup(&mut self) -> Option<Vec<String>> {
        let mut tokens = vec!["init".to_string()];
        match &self.program {
            Some(program) => {
                tokens.push("True".to_string());
                tokens.push(program.clone());
            }
            None => {
                tokens.push("False".to_string());
                tokens.push("no recognizer program configured".to_string());
            }
        }
        Some(tokens)
    }

    fn execute(&mut self, command: &WorkerCommand) -> Option<Vec<String>> {
        let matched = match command.verb.as_str() {
            "hear" => self.hear(&command.argument),
            other => {
                warn!(verb = other, "unknown recognition command");
                false
            }
        };
        Some(vec![if matched { "True" } else { "False" }.to_string()])
    }
}

/// Lowercase, drop punctuation, collapse whitespace
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\'')
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
