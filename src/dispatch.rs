//! Action dispatcher
//!
//! Maps each action emitted by the state machine onto a worker command or a
//! display update. No decisions are made here; order is preserved exactly as
//! the machine returned it.

use tracing::{debug, info, warn};

use crate::context::Context;
use crate::events::Action;
use crate::phrases::PhraseManager;
use crate::workers::{CommandSink, WorkerCommand};

/// The three workers the dispatcher can reach
pub struct Workers<S> {
    pub speech: S,
    pub recognition: S,
    pub hardware: S,
}

/// Translates actions into effects
pub struct Dispatcher<S: CommandSink> {
    workers: Workers<S>,
    phrases: PhraseManager,
    relay_on: bool,
    /// Ticks left before a test pulse switches the relay back off
    pulse_ticks: u32,
    /// Recognition results still queued for requests nobody waits on
    stale_results: u32,
}

impl<S: CommandSink> Dispatcher<S> {
    pub fn new(workers: Workers<S>, phrases: PhraseManager) -> Self {
        Self {
            workers,
            phrases,
            relay_on: false,
            pulse_ticks: 0,
            stale_results: 0,
        }
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }

    /// Hand the workers back for shutdown
    pub fn into_workers(self) -> Workers<S> {
        self.workers
    }

    /// Carry out one action
    pub fn dispatch(&mut self, action: &Action, ctx: &mut Context) {
        match action {
            Action::Speak { text } => {
                self.submit(Target::Speech, WorkerCommand::say(text.clone()));
            }
            Action::SpeakNextPhrase => {
                ctx.phrase = self.phrases.next_phrase();
                ctx.failed = false;
                self.submit(Target::Speech, WorkerCommand::say(ctx.phrase.clone()));
            }
            Action::BeginListening => {
                self.submit(Target::Recognition, WorkerCommand::hear(ctx.phrase.clone()));
            }
            Action::AcknowledgeStrike { count } => {
                info!(strikes = count, phrase = %ctx.phrase, "strike");
                ctx.strikes = *count;
            }
            Action::FailAfterMaxStrikes => {
                info!(phrase = %ctx.phrase, "exchange failed after max strikes");
                ctx.failed = true;
            }
            Action::HardwareOn { attempts } => {
                info!(attempts, phrase = %ctx.phrase, "EXT ON");
                self.set_relay(true);
            }
            Action::HardwareOff => {
                info!("EXT OFF");
                self.set_relay(false);
                ctx.strikes = 0;
            }
        }
    }

    /// Mark the oldest outstanding `hear` request as abandoned
    ///
    /// The recognizer still answers it, ahead of any later request, so that
    /// answer must not reach the machine.
    pub fn abandon_recognition(&mut self) {
        self.stale_results += 1;
        debug!(stale = self.stale_results, "recognition request abandoned");
    }

    /// Consume one abandoned request if any are outstanding
    pub fn claim_stale_result(&mut self) -> bool {
        if self.stale_results == 0 {
            return false;
        }
        self.stale_results -= 1;
        true
    }

    /// Switch the relay on for `ticks` ticks
    pub fn pulse_relay(&mut self, ticks: u32) {
        info!(ticks, "relay test pulse");
        self.pulse_ticks = ticks.max(1);
        self.set_relay(true);
    }

    /// Advance the test-pulse countdown by one tick
    pub fn tick(&mut self) {
        if self.pulse_ticks > 0 {
            self.pulse_ticks -= 1;
            if self.pulse_ticks == 0 {
                self.set_relay(false);
            }
        }
    }

    /// Drive the relay output
    ///
    /// On: configure the pin as output, then drive it high. Off: drive it
    /// low, then release it back to an input.
    pub fn set_relay(&mut self, on: bool) {
        let commands = if on {
            [WorkerCommand::pin_output(true), WorkerCommand::pin_write(true)]
        } else {
            [WorkerCommand::pin_write(false), WorkerCommand::pin_output(false)]
        };
        for command in commands {
            self.submit(Target::Hardware, command);
        }
        self.relay_on = on;
    }

    fn submit(&self, target: Target, command: WorkerCommand) {
        let worker = match target {
            Target::Speech => &self.workers.speech,
            Target::Recognition => &self.workers.recognition,
            Target::Hardware => &self.workers.hardware,
        };
        if let Err(e) = worker.submit(command) {
            warn!(?target, %e, "command not delivered");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Speech,
    Recognition,
    Hardware,
}
