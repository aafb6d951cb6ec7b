//! Core state machine implementation
//!
//! Two levels: the outer lifecycle (Halted / Monitoring) is driven by operator
//! keys, and while monitoring a face detection starts the inner speech
//! exchange. `crank` applies exactly one event and returns the ordered actions
//! it produced; it never blocks and never fails.

use std::time::Instant;

use tracing::{debug, info};

use crate::events::{Action, Event, Key};

use super::exchange::{Exchange, ExchangeState};
use super::snapshot::{Color, Snapshot};
use super::timer::RecognitionTimer;

/// Top-level lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not monitoring; only the go key does anything
    Halted,
    /// Watching for faces and running exchanges
    Monitoring,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::Halted
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Halted => write!(f, "Halted"),
            Lifecycle::Monitoring => write!(f, "Monitoring"),
        }
    }
}

/// The state machine that drives the kiosk interaction
pub struct StateMachine {
    /// Outer lifecycle state
    lifecycle: Lifecycle,
    /// Inner speech exchange (Idle whenever halted)
    exchange: Exchange,
    /// Timestamp of the current tick, set by `check_timers`
    clock: Instant,
    /// Display projection, refreshed by every crank and timer check
    snapshot: Snapshot,
}

impl StateMachine {
    /// Create a halted state machine with the given recognition timer
    pub fn new(timer: RecognitionTimer) -> Self {
        Self {
            lifecycle: Lifecycle::Halted,
            exchange: Exchange::new(timer),
            clock: Instant::now(),
            snapshot: Snapshot::default(),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange.state()
    }

    pub fn strikes(&self) -> u8 {
        self.exchange.strikes()
    }

    /// True when no exchange is running (always true while halted)
    pub fn is_idle(&self) -> bool {
        self.exchange.is_idle()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Advance timers to `now` and return any events they produced
    ///
    /// Called once per tick before cranking, so that a deadline armed during
    /// this tick's cranks starts from this tick's timestamp.
    pub fn check_timers(&mut self, now: Instant) -> Vec<Event> {
        self.clock = now;
        let events = self.exchange.check_timers(now).into_iter().collect();
        self.refresh_snapshot();
        events
    }

    /// Apply one event and return the actions it produced, in order
    pub fn crank(&mut self, event: &Event) -> Vec<Action> {
        let actions = match self.lifecycle {
            Lifecycle::Halted => self.crank_halted(event),
            Lifecycle::Monitoring => self.crank_monitoring(event),
        };

        if !actions.is_empty() {
            debug!(%event, ?actions, "crank produced actions");
        }

        self.refresh_snapshot();
        actions
    }

    fn crank_halted(&mut self, event: &Event) -> Vec<Action> {
        match event {
            Event::Key { key: Key::Go } => {
                self.transition_to(Lifecycle::Monitoring);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn crank_monitoring(&mut self, event: &Event) -> Vec<Action> {
        match event {
            Event::Key { key: Key::Halt } => {
                self.exchange.reset();
                self.transition_to(Lifecycle::Halted);
                vec![Action::HardwareOff]
            }
            _ if self.exchange.state().is_terminal() => self.exchange.handle(event, self.clock),
            Event::FaceDetected | Event::Key { key: Key::Listen } if self.exchange.is_idle() => {
                self.exchange.start()
            }
            _ => self.exchange.handle(event, self.clock),
        }
    }

    fn transition_to(&mut self, new_state: Lifecycle) {
        info!(
            from = %self.lifecycle,
            to = %new_state,
            "state transition"
        );
        self.lifecycle = new_state;
    }

    fn refresh_snapshot(&mut self) {
        self.snapshot = match self.lifecycle {
            Lifecycle::Halted => Snapshot::default(),
            Lifecycle::Monitoring => {
                let inner = self.exchange.state();
                Snapshot {
                    label: inner.label(),
                    color: if inner == ExchangeState::Idle {
                        Color::Green
                    } else {
                        Color::Blue
                    },
                    progress: self.exchange.progress(self.clock),
                    exchange_color: inner.color(),
                }
            }
        };
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(RecognitionTimer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_state_machine() -> (StateMachine, Instant) {
        let mut sm = StateMachine::new(RecognitionTimer::new(Duration::from_secs(10)));
        let now = Instant::now();
        sm.check_timers(now);
        (sm, now)
    }

    fn monitoring() -> (StateMachine, Instant) {
        let (mut sm, now) = create_state_machine();
        sm.crank(&Event::key(Key::Go));
        (sm, now)
    }

    fn listening() -> (StateMachine, Instant) {
        let (mut sm, now) = monitoring();
        sm.crank(&Event::FaceDetected);
        sm.crank(&Event::SpeechFinished);
        (sm, now)
    }

    fn fail_once(sm: &mut StateMachine) -> Vec<Action> {
        let actions = sm.crank(&Event::RecognitionResult { matched: false });
        if sm.exchange_state() == ExchangeState::Speaking {
            sm.crank(&Event::SpeechFinished);
        }
        actions
    }

    #[test]
    fn test_initial_state() {
        let (sm, _) = create_state_machine();
        assert_eq!(sm.lifecycle(), Lifecycle::Halted);
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
        assert_eq!(sm.snapshot().label, "HALT");
    }

    #[test]
    fn test_go_starts_monitoring() {
        let (mut sm, _) = create_state_machine();
        let actions = sm.crank(&Event::key(Key::Go));
        assert!(actions.is_empty());
        assert_eq!(sm.lifecycle(), Lifecycle::Monitoring);
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
    }

    #[test]
    fn test_face_ignored_while_halted() {
        let (mut sm, _) = create_state_machine();
        assert!(sm.crank(&Event::FaceDetected).is_empty());
        assert_eq!(sm.lifecycle(), Lifecycle::Halted);
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
    }

    #[test]
    fn test_face_starts_exchange() {
        let (mut sm, _) = monitoring();
        let actions = sm.crank(&Event::FaceDetected);
        assert_eq!(actions, vec![Action::SpeakNextPhrase]);
        assert_eq!(sm.exchange_state(), ExchangeState::Speaking);
        assert_eq!(sm.strikes(), 0);
    }

    #[test]
    fn test_listen_key_starts_exchange() {
        let (mut sm, _) = monitoring();
        let actions = sm.crank(&Event::key(Key::Listen));
        assert_eq!(actions, vec![Action::SpeakNextPhrase]);
    }

    #[test]
    fn test_face_ignored_during_exchange() {
        let (mut sm, _) = monitoring();
        sm.crank(&Event::FaceDetected);
        assert!(sm.crank(&Event::FaceDetected).is_empty());
        assert_eq!(sm.exchange_state(), ExchangeState::Speaking);
    }

    #[test]
    fn test_speech_finished_begins_listening() {
        let (mut sm, _) = monitoring();
        sm.crank(&Event::FaceDetected);
        let actions = sm.crank(&Event::SpeechFinished);
        assert_eq!(actions, vec![Action::BeginListening]);
        assert_eq!(sm.exchange_state(), ExchangeState::Listening);
        assert_eq!(sm.snapshot().progress, 1.0);
    }

    #[test]
    fn test_three_strikes_fail_exchange() {
        let (mut sm, _) = listening();
        fail_once(&mut sm);
        fail_once(&mut sm);
        assert_eq!(sm.strikes(), 2);
        assert_eq!(sm.exchange_state(), ExchangeState::Listening);

        let actions = sm.crank(&Event::RecognitionResult { matched: false });
        assert_eq!(
            actions,
            vec![
                Action::AcknowledgeStrike { count: 3 },
                Action::FailAfterMaxStrikes,
                Action::HardwareOff
            ]
        );
        assert_eq!(sm.exchange_state(), ExchangeState::Failed);
        assert_eq!(sm.strikes(), 3);
    }

    #[test]
    fn test_success_then_idle_on_next_tick() {
        let (mut sm, _) = listening();
        let actions = sm.crank(&Event::RecognitionResult { matched: true });
        assert_eq!(actions, vec![Action::HardwareOn { attempts: 1 }]);
        assert_eq!(sm.exchange_state(), ExchangeState::Success);

        assert!(sm.crank(&Event::Tick).is_empty());
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
        assert_eq!(sm.lifecycle(), Lifecycle::Monitoring);
    }

    #[test]
    fn test_terminal_consumes_face_event() {
        let (mut sm, _) = listening();
        sm.crank(&Event::RecognitionResult { matched: true });
        assert!(sm.crank(&Event::FaceDetected).is_empty());
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
    }

    #[test]
    fn test_halt_clears_exchange() {
        let (mut sm, _) = listening();
        fail_once(&mut sm);
        let actions = sm.crank(&Event::key(Key::Halt));
        assert_eq!(actions, vec![Action::HardwareOff]);
        assert_eq!(sm.lifecycle(), Lifecycle::Halted);
        assert_eq!(sm.exchange_state(), ExchangeState::Idle);
        assert_eq!(sm.strikes(), 0);
        assert_eq!(sm.snapshot().progress, 0.0);
    }

    #[test]
    fn test_late_result_after_halt_is_ignored() {
        let (mut sm, _) = listening();
        sm.crank(&Event::key(Key::Halt));
        assert!(sm.crank(&Event::RecognitionResult { matched: true }).is_empty());
        assert_eq!(sm.lifecycle(), Lifecycle::Halted);
    }

    #[test]
    fn test_timeout_counts_as_strike() {
        let (mut sm, now) = listening();
        let events = sm.check_timers(now + Duration::from_secs(10));
        assert_eq!(events, vec![Event::RecognitionTimeout]);
        assert_eq!(sm.snapshot().progress, 0.0);

        let actions = sm.crank(&events[0]);
        assert_eq!(actions[0], Action::AcknowledgeStrike { count: 1 });
        assert_eq!(sm.exchange_state(), ExchangeState::Speaking);

        assert!(sm.check_timers(now + Duration::from_secs(30)).is_empty());
    }

    #[test]
    fn test_progress_non_increasing_while_listening() {
        let (mut sm, now) = listening();
        let mut last = sm.snapshot().progress;
        for secs in 1..10 {
            assert!(sm.check_timers(now + Duration::from_secs(secs)).is_empty());
            let progress = sm.snapshot().progress;
            assert!(progress <= last);
            assert!(progress > 0.0);
            last = progress;
        }
    }

    #[test]
    fn test_progress_zero_outside_listening() {
        let (mut sm, now) = monitoring();
        sm.crank(&Event::FaceDetected);
        sm.check_timers(now + Duration::from_secs(1));
        assert_eq!(sm.snapshot().progress, 0.0);
    }

    #[test]
    fn test_crank_is_deterministic() {
        let script = [
            Event::key(Key::Go),
            Event::FaceDetected,
            Event::SpeechFinished,
            Event::RecognitionResult { matched: false },
            Event::SpeechFinished,
            Event::RecognitionTimeout,
        ];
        let run = || {
            let (mut sm, _) = create_state_machine();
            script
                .iter()
                .map(|event| sm.crank(event))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_unmatched_events_are_identity() {
        let (mut sm, _) = monitoring();
        sm.crank(&Event::FaceDetected);
        for event in [
            Event::Tick,
            Event::key(Key::Go),
            Event::HardwareAck,
            Event::RecognitionResult { matched: true },
            Event::RecognitionTimeout,
        ] {
            assert!(sm.crank(&event).is_empty());
            assert_eq!(sm.exchange_state(), ExchangeState::Speaking);
            assert_eq!(sm.lifecycle(), Lifecycle::Monitoring);
        }
    }

    fn every_event() -> Vec<Event> {
        vec![
            Event::Tick,
            Event::FaceDetected,
            Event::key(Key::Go),
            Event::key(Key::Halt),
            Event::key(Key::Listen),
            Event::SpeechFinished,
            Event::RecognitionResult { matched: true },
            Event::RecognitionResult { matched: false },
            Event::HardwareAck,
            Event::RecognitionTimeout,
        ]
    }

    fn halted() -> StateMachine {
        create_state_machine().0
    }

    fn idle() -> StateMachine {
        monitoring().0
    }

    fn speaking_after_strike() -> StateMachine {
        let (mut sm, _) = listening();
        sm.crank(&Event::RecognitionResult { matched: false });
        sm
    }

    fn listening_after_strike() -> StateMachine {
        let mut sm = speaking_after_strike();
        sm.crank(&Event::SpeechFinished);
        sm
    }

    #[test]
    fn test_unmatched_events_are_identity_in_every_state() {
        type Setup = fn() -> StateMachine;
        let table = vec![
            (halted as Setup, vec![Event::key(Key::Go)]),
            (
                idle as Setup,
                vec![
                    Event::key(Key::Halt),
                    Event::FaceDetected,
                    Event::key(Key::Listen),
                ],
            ),
            (
                speaking_after_strike as Setup,
                vec![Event::key(Key::Halt), Event::SpeechFinished],
            ),
            (
                listening_after_strike as Setup,
                vec![
                    Event::key(Key::Halt),
                    Event::RecognitionResult { matched: true },
                    Event::RecognitionResult { matched: false },
                    Event::RecognitionTimeout,
                ],
            ),
        ];

        for (setup, handled) in table {
            for event in every_event() {
                if handled.contains(&event) {
                    continue;
                }

                let mut sm = setup();
                let before = (
                    sm.lifecycle(),
                    sm.exchange_state(),
                    sm.strikes(),
                    sm.exchange.timer().is_armed(),
                );

                let actions = sm.crank(&event);
                let after = (
                    sm.lifecycle(),
                    sm.exchange_state(),
                    sm.strikes(),
                    sm.exchange.timer().is_armed(),
                );

                assert!(actions.is_empty(), "{:?} in {:?} gave {:?}", event, before, actions);
                assert_eq!(after, before, "{:?} changed state", event);
            }
        }
    }
}
