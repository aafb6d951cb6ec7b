//! Keyboard listener reading operator keys one press at a time
//!
//! Runs on a dedicated thread. It polls the key source with a short timeout
//! so `stop` is noticed promptly, decodes each press into a [`KeyCommand`]
//! and forwards it to the control loop, which polls the channel once per
//! tick.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::KeyCommand;
use super::terminal::TerminalKeys;

/// Upper bound on how long `stop` waits for the thread to notice
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of waiting for one key
#[derive(Debug)]
pub enum KeyPoll {
    Key(KeyEvent),
    Timeout,
    /// No more input will arrive
    Closed,
}

/// Something that produces key events
pub trait KeySource {
    /// Wait up to `timeout` for the next key event
    fn next_key(&mut self, timeout: Duration) -> io::Result<KeyPoll>;
}

/// Keyboard listener that forwards decoded key commands
pub struct KeyboardListener {
    key_tx: mpsc::Sender<KeyCommand>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl KeyboardListener {
    /// Create a new keyboard listener
    pub fn new(key_tx: mpsc::Sender<KeyCommand>) -> Self {
        Self {
            key_tx,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start listening on the terminal
    ///
    /// The terminal stays in raw mode until the listener stops.
    pub fn start(&self) -> Result<(), KeyboardError> {
        if self.is_running() {
            return Err(KeyboardError::AlreadyRunning);
        }
        let keys = TerminalKeys::open().map_err(KeyboardError::Terminal)?;
        self.start_with(keys)
    }

    /// Start listening on an arbitrary key source
    pub fn start_with<S: KeySource + Send + 'static>(&self, source: S) -> Result<(), KeyboardError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(KeyboardError::AlreadyRunning);
        }

        let key_tx = self.key_tx.clone();
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("keyboard-listener".to_string())
            .spawn(move || {
                info!("keyboard listener thread started");

                if let Err(e) = read_keys(source, key_tx, &running) {
                    error!(?e, "keyboard listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("keyboard listener thread stopped");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(KeyboardError::ThreadSpawn(e.to_string()));
            }
        };

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Stop the listener and wait for its thread, restoring the terminal
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("keyboard listener thread panicked");
            }
        }
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for KeyboardListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Errors that can occur in the keyboard listener
#[derive(Debug, thiserror::Error)]
pub enum KeyboardError {
    #[error("keyboard listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Read keys until the source closes, stop, or the control loop goes away
fn read_keys<S: KeySource>(
    mut source: S,
    key_tx: mpsc::Sender<KeyCommand>,
    running: &AtomicBool,
) -> Result<(), KeyboardError> {
    while running.load(Ordering::SeqCst) {
        let event = match source.next_key(POLL_INTERVAL)? {
            KeyPoll::Key(event) => event,
            KeyPoll::Timeout => continue,
            KeyPoll::Closed => {
                debug!("keyboard input closed");
                break;
            }
        };

        let Some(command) = KeyCommand::from_key(&event) else {
            continue;
        };
        debug!(?command, "key pressed");
        if key_tx.blocking_send(command).is_err() {
            warn!("failed to send key command - channel closed?");
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Key;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::collections::VecDeque;

    /// Replays fixed key presses, then reports closed input
    struct ScriptedKeys(VecDeque<KeyEvent>);

    impl ScriptedKeys {
        fn new(keys: &str) -> Self {
            Self(
                keys.chars()
                    .map(|c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
                    .collect(),
            )
        }
    }

    impl KeySource for ScriptedKeys {
        fn next_key(&mut self, _timeout: Duration) -> io::Result<KeyPoll> {
            Ok(self.0.pop_front().map_or(KeyPoll::Closed, KeyPoll::Key))
        }
    }

    /// Never produces a key
    struct SilentKeys;

    impl KeySource for SilentKeys {
        fn next_key(&mut self, timeout: Duration) -> io::Result<KeyPoll> {
            thread::sleep(timeout);
            Ok(KeyPoll::Timeout)
        }
    }

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = KeyboardListener::new(tx);
        assert!(!listener.is_running());
    }

    #[test]
    fn test_reads_and_decodes_keys() {
        let (tx, mut rx) = mpsc::channel(32);
        let running = AtomicBool::new(true);
        read_keys(ScriptedKeys::new("gxhQ"), tx, &running).unwrap();

        let mut keys = Vec::new();
        while let Ok(key) = rx.try_recv() {
            keys.push(key);
        }
        assert_eq!(
            keys,
            vec![
                KeyCommand::Machine(Key::Go),
                KeyCommand::Machine(Key::Halt),
                KeyCommand::Quit
            ]
        );
    }

    #[test]
    fn test_start_twice_fails() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = KeyboardListener::new(tx);

        listener.start_with(SilentKeys).unwrap();
        assert!(listener.is_running());
        assert!(matches!(
            listener.start_with(SilentKeys),
            Err(KeyboardError::AlreadyRunning)
        ));

        listener.stop();
    }

    #[test]
    fn test_stop_ends_idle_thread() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = KeyboardListener::new(tx);

        listener.start_with(SilentKeys).unwrap();
        listener.stop();
        assert!(!listener.is_running());

        listener.start_with(ScriptedKeys::new("g")).unwrap();
        listener.stop();
    }
}
