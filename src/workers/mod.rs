//! Worker module: asynchronous speech and hardware subsystems
//!
//! Three workers (speech output, speech recognition, serial hardware) each
//! run one command at a time on their own thread and report back through a
//! single shared inbox drained by the control loop.

mod hardware;
mod inbox;
mod protocol;
mod proxy;
mod recognition;
mod speech;

pub use hardware::SerialLink;
pub use inbox::{inbox, Inbox, InboxSender};
pub use protocol::{Report, Topic, WorkerCommand, WorkerMessage};
pub use proxy::{CommandSink, WorkerProxy};
pub use recognition::CommandRecognizer;
pub use speech::CommandSpeaker;

/// Errors that can occur when talking to a worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn {name} worker: {reason}")]
    Spawn { name: &'static str, reason: String },

    #[error("{0} worker is no longer accepting commands")]
    QueueClosed(&'static str),

    #[error("worker inbox is closed")]
    InboxClosed,
}
