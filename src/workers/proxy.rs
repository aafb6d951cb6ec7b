//! Worker proxy: one background thread, one command at a time
//!
//! Each proxy owns a dedicated thread running a blocking [`Engine`]. Commands
//! submitted while the engine is busy wait in the proxy's queue and run in
//! submission order. Every answered command produces exactly one message on
//! the shared inbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::inbox::InboxSender;
use super::protocol::{Topic, WorkerCommand, WorkerMessage};
use super::WorkerError;

/// A blocking engine driven by a worker thread
pub trait Engine: Send + 'static {
    /// Topic tag stamped on every message this engine produces
    fn topic(&self) -> Topic;

    /// Optional one-time report posted before the first command runs
    fn startup(&mut self) -> Option<Vec<String>> {
        None
    }

    /// Run one command to completion and return the response tokens
    ///
    /// `None` means the engine is permanently unable to answer (for example a
    /// serial port that never opened); no message is posted in that case.
    fn execute(&mut self, command: &WorkerCommand) -> Option<Vec<String>>;
}

/// The narrow interface the dispatcher uses to reach a worker
pub trait CommandSink {
    fn submit(&self, command: WorkerCommand) -> Result<(), WorkerError>;
}

/// Handle to a running worker thread
pub struct WorkerProxy {
    name: &'static str,
    commands: Option<mpsc::Sender<WorkerCommand>>,
    handle: Option<JoinHandle<()>>,
    busy: Arc<AtomicBool>,
}

impl WorkerProxy {
    /// Spawn a named worker thread around `engine`
    pub fn spawn<E: Engine>(
        name: &'static str,
        mut engine: E,
        inbox: InboxSender,
    ) -> Result<Self, WorkerError> {
        let (tx, rx) = mpsc::channel::<WorkerCommand>();
        let busy = Arc::new(AtomicBool::new(false));
        let thread_busy = Arc::clone(&busy);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                info!(worker = name, "worker thread started");
                let topic = engine.topic();

                if let Some(tokens) = engine.startup() {
                    if inbox.post(WorkerMessage::new(topic, tokens)).is_err() {
                        return;
                    }
                }

                while let Ok(command) = rx.recv() {
                    thread_busy.store(true, Ordering::SeqCst);
                    debug!(worker = name, %command, "executing command");
                    let reply = engine.execute(&command);
                    thread_busy.store(false, Ordering::SeqCst);

                    let Some(tokens) = reply else {
                        debug!(worker = name, %command, "engine gave no answer");
                        continue;
                    };
                    if inbox.post(WorkerMessage::new(topic, tokens)).is_err() {
                        warn!(worker = name, "inbox closed, worker exiting");
                        break;
                    }
                }

                info!(worker = name, "worker thread stopped");
            })
            .map_err(|e| WorkerError::Spawn {
                name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            commands: Some(tx),
            handle: Some(handle),
            busy,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if the engine is in the middle of a command
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Close the queue and give the thread `grace` to finish what it holds
    pub async fn shutdown(mut self, grace: Duration) {
        self.commands.take();
        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = tokio::time::Instant::now() + grace;
        while !handle.is_finished() {
            if tokio::time::Instant::now() >= deadline {
                warn!(worker = self.name, "worker still busy at shutdown, detaching");
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        if handle.join().is_err() {
            warn!(worker = self.name, "worker thread panicked");
        }
    }
}

impl CommandSink for WorkerProxy {
    fn submit(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        let commands = self
            .commands
            .as_ref()
            .ok_or(WorkerError::QueueClosed(self.name))?;

        if self.is_busy() {
            debug!(worker = self.name, %command, "worker busy, command queued");
        }

        commands
            .send(command)
            .map_err(|_| WorkerError::QueueClosed(self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::inbox::{inbox, Inbox};
    use std::time::Instant;

    /// Echoes the command back, optionally after a delay
    struct EchoEngine {
        delay: Duration,
    }

    impl Engine for EchoEngine {
        fn topic(&self) -> Topic {
            Topic::Hardware
        }

        fn startup(&mut self) -> Option<Vec<String>> {
            Some(vec!["ready".to_string()])
        }

        fn execute(&mut self, command: &WorkerCommand) -> Option<Vec<String>> {
            thread::sleep(self.delay);
            Some(vec![command.verb.clone(), command.argument.clone()])
        }
    }

    /// Never answers
    struct DeadEngine;

    impl Engine for DeadEngine {
        fn topic(&self) -> Topic {
            Topic::Hardware
        }

        fn execute(&mut self, _command: &WorkerCommand) -> Option<Vec<String>> {
            None
        }
    }

    fn wait_for(inbox: &mut Inbox, count: usize) -> Vec<WorkerMessage> {
        let started = Instant::now();
        let mut messages = Vec::new();
        while messages.len() < count && started.elapsed() < Duration::from_secs(5) {
            messages.extend(inbox.drain());
            thread::sleep(Duration::from_millis(5));
        }
        messages
    }

    #[test]
    fn test_commands_run_in_submission_order() {
        let (tx, mut rx) = inbox();
        let proxy = WorkerProxy::spawn(
            "echo",
            EchoEngine {
                delay: Duration::from_millis(10),
            },
            tx,
        )
        .unwrap();

        proxy.submit(WorkerCommand::pin_output(true)).unwrap();
        proxy.submit(WorkerCommand::pin_write(true)).unwrap();
        proxy.submit(WorkerCommand::pin_write(false)).unwrap();

        let messages = wait_for(&mut rx, 4);
        let lines: Vec<String> = messages.iter().map(|m| m.tokens.join(" ")).collect();
        assert_eq!(lines, vec!["ready", "dig0_cfg 0", "dig0_io 1", "dig0_io 0"]);
    }

    #[test]
    fn test_unanswered_commands_post_nothing() {
        let (tx, mut rx) = inbox();
        let proxy = WorkerProxy::spawn("dead", DeadEngine, tx).unwrap();
        proxy.submit(WorkerCommand::pin_write(true)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(rx.drain().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_joins_idle_worker() {
        let (tx, _rx) = inbox();
        let proxy = WorkerProxy::spawn(
            "echo",
            EchoEngine {
                delay: Duration::ZERO,
            },
            tx,
        )
        .unwrap();
        assert_eq!(proxy.name(), "echo");
        proxy.shutdown(Duration::from_secs(1)).await;
    }
}
