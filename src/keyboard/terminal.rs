//! Raw terminal access for single-keypress input
//!
//! Raw mode delivers each key as it is pressed but also turns off output
//! post-processing, so log lines need an explicit carriage return while it
//! is active.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal;
use tracing::warn;

use super::listener::{KeyPoll, KeySource};

static RAW_MODE: AtomicBool = AtomicBool::new(false);

/// Keeps the terminal in raw mode until dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        RAW_MODE.store(true, Ordering::SeqCst);
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        RAW_MODE.store(false, Ordering::SeqCst);
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(?e, "failed to restore terminal mode");
        }
    }
}

/// Key events from the controlling terminal
pub struct TerminalKeys {
    _raw: RawModeGuard,
}

impl TerminalKeys {
    /// Switch the terminal to raw mode; restored when dropped
    pub fn open() -> io::Result<Self> {
        Ok(Self {
            _raw: RawModeGuard::enable()?,
        })
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<KeyPoll> {
        if !event::poll(timeout)? {
            return Ok(KeyPoll::Timeout);
        }
        match event::read()? {
            Event::Key(key) => Ok(KeyPoll::Key(key)),
            _ => Ok(KeyPoll::Timeout),
        }
    }
}

/// Log writer that ends lines with CRLF while the terminal is raw
pub struct ConsoleWriter<W> {
    inner: W,
    crlf: bool,
}

/// Writer factory for `tracing_subscriber::fmt().with_writer`
pub fn console_writer() -> ConsoleWriter<io::Stdout> {
    ConsoleWriter {
        inner: io::stdout(),
        crlf: RAW_MODE.load(Ordering::SeqCst),
    }
}

impl<W: Write> Write for ConsoleWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.crlf {
            return self.inner.write(buf);
        }
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            match chunk.strip_suffix(b"\n") {
                Some(line) => {
                    self.inner.write_all(line)?;
                    self.inner.write_all(b"\r\n")?;
                }
                None => self.inner.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
