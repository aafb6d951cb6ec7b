//! Shared inbox for worker results
//!
//! Many worker threads post, one control loop drains. Posting never blocks and
//! draining never waits for messages that have not arrived yet.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::protocol::WorkerMessage;
use super::WorkerError;

/// Producer half, cloned into every worker thread
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: UnboundedSender<WorkerMessage>,
}

impl InboxSender {
    /// Post a result; fails only once the inbox has been dropped
    pub fn post(&self, message: WorkerMessage) -> Result<(), WorkerError> {
        self.tx.send(message).map_err(|_| WorkerError::InboxClosed)
    }
}

/// Consumer half, owned by the control loop
#[derive(Debug)]
pub struct Inbox {
    rx: UnboundedReceiver<WorkerMessage>,
}

impl Inbox {
    /// Take everything currently queued, in arrival order
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

/// Create a connected inbox pair
pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboxSender { tx }, Inbox { rx })
}
