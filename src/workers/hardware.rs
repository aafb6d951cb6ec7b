//! Serial hardware engine
//!
//! Writes one `verb argument` line per command to a serial device and reads
//! one status line back. If the device fails to open, the link stays
//! disconnected and its commands never complete.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::protocol::{Topic, WorkerCommand};
use super::proxy::Engine;

/// Errors opening the serial device
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clone serial handle: {0}")]
    Clone(#[source] std::io::Error),
}

/// Line-oriented link to the relay controller
#[derive(Debug)]
pub struct SerialLink {
    port: Option<Port>,
}

#[derive(Debug)]
struct Port {
    writer: File,
    reader: BufReader<File>,
}

impl SerialLink {
    /// Open the device read/write
    ///
    /// Line settings (baud rate, framing) are left as the OS has them.
    pub fn open(path: &Path) -> Result<Self, SerialError> {
        let writer = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SerialError::Open {
                path: path.to_owned(),
                source,
            })?;
        let reader = BufReader::new(writer.try_clone().map_err(SerialError::Clone)?);

        info!(?path, "serial port opened");
        Ok(Self {
            port: Some(Port { writer, reader }),
        })
    }

    /// A link with no device behind it
    pub fn disconnected() -> Self {
        Self { port: None }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Port {
    fn transact(&mut self, command: &WorkerCommand) -> std::io::Result<String> {
        writeln!(self.writer, "{}", command)?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Engine for SerialLink {
    fn topic(&self) -> Topic {
        Topic::Hardware
    }

    fn execute(&mut self, command: &WorkerCommand) -> Option<Vec<String>> {
        let port = self.port.as_mut()?;

        let tokens = match port.transact(command) {
            Ok(line) if line.is_empty() => vec![command.verb.clone(), "OK".to_string()],
            Ok(line) => line.split_whitespace().map(str::to_string).collect(),
            Err(e) => {
                warn!(%command, ?e, "serial transaction failed");
                vec![command.verb.clone(), "ERR".to_string(), e.to_string()]
            }
        };
        Some(tokens)
    }
}
