//! The tick loop tying everything together
//!
//! Once per tick: capture a frame, run vision, drain the worker inbox, check
//! timers, crank the state machine with the whole batch, dispatch the
//! resulting actions in order, refresh the display, then poll the keyboard.
//! Keys feed the machine on the following tick.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::dispatch::Dispatcher;
use crate::events::{Action, Event};
use crate::keyboard::{KeyCommand, HELP};
use crate::state::{ExchangeState, StateMachine};
use crate::workers::{CommandSink, Inbox, Report};

use super::display::{ConsoleDisplay, FrameRate};
use super::vision::{Camera, Vision};

/// Whether the loop should keep going after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Tunables for the loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Time between ticks
    pub frame_period: Duration,
    /// Length of a `Z` test pulse, in ticks
    pub relay_pulse_ticks: u32,
}

/// Owns the state machine and drives it from the tick loop
pub struct ControlLoop<C, V, S: CommandSink> {
    camera: C,
    vision: V,
    machine: StateMachine,
    inbox: Inbox,
    dispatcher: Dispatcher<S>,
    keys: mpsc::Receiver<KeyCommand>,
    ctx: Context,
    display: ConsoleDisplay,
    frame_rate: FrameRate,
    settings: LoopSettings,
    /// Key events waiting for the next tick
    pending: Vec<Event>,
}

impl<C: Camera, V: Vision, S: CommandSink> ControlLoop<C, V, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: C,
        vision: V,
        machine: StateMachine,
        inbox: Inbox,
        dispatcher: Dispatcher<S>,
        keys: mpsc::Receiver<KeyCommand>,
        ctx: Context,
        settings: LoopSettings,
    ) -> Self {
        Self {
            camera,
            vision,
            machine,
            inbox,
            dispatcher,
            keys,
            ctx,
            display: ConsoleDisplay::default(),
            frame_rate: FrameRate::new(Instant::now()),
            settings,
            pending: Vec::new(),
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Dispatch an action outside of the state machine (start-up greeting)
    pub fn announce(&mut self, action: Action) {
        self.dispatcher.dispatch(&action, &mut self.ctx);
    }

    /// Run ticks at the frame rate until the operator quits
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.settings.frame_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            period_ms = self.settings.frame_period.as_millis() as u64,
            "control loop started"
        );

        loop {
            ticker.tick().await;
            if self.tick(Instant::now()) == Flow::Quit {
                info!("quit requested");
                break;
            }
        }
    }

    /// Release the external output and hand back the dispatcher
    pub fn finish(mut self) -> Dispatcher<S> {
        self.dispatcher.set_relay(false);
        self.dispatcher
    }

    /// One iteration of the loop
    pub fn tick(&mut self, now: Instant) -> Flow {
        let mut events = vec![Event::Tick];
        events.append(&mut self.pending);

        match self.camera.capture() {
            Ok(frame) => {
                let detection = self.vision.detect(&frame, self.ctx.eyes, self.ctx.grin);
                if detection.found {
                    debug!(regions = detection.regions.len(), "face detected");
                    events.push(Event::FaceDetected);
                }
            }
            Err(e) => warn!(%e, "frame skipped"),
        }

        let idle = self.machine.is_idle();
        for message in self.inbox.drain() {
            debug!(%message, "worker message");
            let report = Report::parse(&message);
            if let Report::Recognized { matched } = report {
                if self.dispatcher.claim_stale_result() {
                    info!(matched, "recognition result for an abandoned request discarded");
                    continue;
                }
            }
            if let Some(event) = report.into_event(idle) {
                events.push(event);
            }
        }

        // timers first so a deadline armed below starts from this tick
        let timer_events = self.machine.check_timers(now);
        events.extend(timer_events);

        let mut actions = Vec::new();
        for event in &events {
            let was_listening = self.machine.exchange_state() == ExchangeState::Listening;
            actions.extend(self.machine.crank(event));

            // left Listening without an answer: the pending `hear` is orphaned
            if was_listening
                && self.machine.exchange_state() != ExchangeState::Listening
                && !matches!(event, Event::RecognitionResult { .. })
            {
                self.dispatcher.abandon_recognition();
            }
        }
        for action in &actions {
            self.dispatcher.dispatch(action, &mut self.ctx);
        }

        self.dispatcher.tick();
        self.frame_rate.update(now);
        self.display
            .render(self.machine.snapshot(), &self.ctx, &self.frame_rate.label());

        self.poll_keys()
    }

    /// Handle keys pressed since the last poll
    fn poll_keys(&mut self) -> Flow {
        while let Ok(key) = self.keys.try_recv() {
            match key {
                KeyCommand::Quit => return Flow::Quit,
                KeyCommand::Machine(key) => self.pending.push(Event::key(key)),
                KeyCommand::ToggleEyes => {
                    self.ctx.eyes = !self.ctx.eyes;
                    info!(eyes = self.ctx.eyes, "eye detection toggled");
                }
                KeyCommand::ToggleGrin => {
                    self.ctx.grin = !self.ctx.grin;
                    info!(grin = self.ctx.grin, "smile detection toggled");
                }
                KeyCommand::TogglePresence => {
                    let present = self.ctx.toggle_presence();
                    info!(present, "simulated face presence toggled");
                }
                KeyCommand::SayTest if self.machine.is_idle() => {
                    self.dispatcher
                        .dispatch(&Action::SpeakNextPhrase, &mut self.ctx);
                }
                KeyCommand::HearTest if self.machine.is_idle() => {
                    info!(phrase = %self.ctx.phrase, "recognition test");
                    self.dispatcher
                        .dispatch(&Action::BeginListening, &mut self.ctx);
                    self.dispatcher.abandon_recognition();
                }
                KeyCommand::SayTest | KeyCommand::HearTest => {
                    debug!(?key, "test key ignored during exchange");
                }
                KeyCommand::PulseRelay => {
                    self.dispatcher.pulse_relay(self.settings.relay_pulse_ticks);
                }
                KeyCommand::Help => {
                    for line in HELP {
                        info!("{}", line);
                    }
                }
            }
        }
        Flow::Continue
    }
}
