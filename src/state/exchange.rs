//! Speech-exchange sub-machine
//!
//! One exchange is a speak -> listen -> evaluate cycle, retried until the
//! phrase is repeated correctly or the strike bound is reached:
//!
//! - Idle -> Speaking (exchange started)
//! - Speaking -> Listening (speech output finished, recognition timer armed)
//! - Listening -> Success (phrase matched)
//! - Listening -> Ack (mismatch or timeout), then Speaking or Failed
//! - Success / Failed -> Idle (on the next event, whatever it is)

use std::time::Instant;

use tracing::{debug, info};

use crate::events::{Action, Event};

use super::snapshot::Color;
use super::timer::RecognitionTimer;

/// Failed attempts allowed before an exchange fails outright
pub const MAX_STRIKES: u8 = 3;

/// States of the speech exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No exchange in progress
    Idle,
    /// Scripted phrase is being spoken
    Speaking,
    /// Waiting for the recognizer, timer running
    Listening,
    /// Evaluating a failed attempt (never observable between cranks)
    Ack,
    /// Phrase was repeated correctly
    Success,
    /// Strike bound reached
    Failed,
}

impl Default for ExchangeState {
    fn default() -> Self {
        Self::Idle
    }
}

impl ExchangeState {
    /// Status label and indicator color for this state
    pub fn label(self) -> &'static str {
        match self {
            ExchangeState::Idle => "MON",
            ExchangeState::Speaking => "SAY",
            ExchangeState::Listening => "HEAR",
            ExchangeState::Ack => "ACK",
            ExchangeState::Success => "PASS",
            ExchangeState::Failed => "FAIL",
        }
    }

    pub fn color(self) -> Color {
        match self {
            ExchangeState::Idle => Color::Black,
            ExchangeState::Speaking | ExchangeState::Listening | ExchangeState::Ack => {
                Color::Purple
            }
            ExchangeState::Success => Color::Green,
            ExchangeState::Failed => Color::Red,
        }
    }

    /// Whether this state ends an exchange
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeState::Success | ExchangeState::Failed)
    }
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeState::Idle => write!(f, "Idle"),
            ExchangeState::Speaking => write!(f, "Speaking"),
            ExchangeState::Listening => write!(f, "Listening"),
            ExchangeState::Ack => write!(f, "Ack"),
            ExchangeState::Success => write!(f, "Success"),
            ExchangeState::Failed => write!(f, "Failed"),
        }
    }
}

/// The speech-exchange machine plus its strike counter and deadline
#[derive(Debug, Clone)]
pub struct Exchange {
    state: ExchangeState,
    strikes: u8,
    timer: RecognitionTimer,
}

impl Exchange {
    pub fn new(timer: RecognitionTimer) -> Self {
        Self {
            state: ExchangeState::Idle,
            strikes: 0,
            timer,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn strikes(&self) -> u8 {
        self.strikes
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExchangeState::Idle
    }

    pub fn timer(&self) -> &RecognitionTimer {
        &self.timer
    }

    /// Begin a fresh exchange with a clean strike count
    ///
    /// Ignored unless idle; exchanges never nest.
    pub fn start(&mut self) -> Vec<Action> {
        if !self.is_idle() {
            debug!(state = %self.state, "exchange already active, start ignored");
            return Vec::new();
        }
        self.strikes = 0;
        self.transition_to(ExchangeState::Speaking);
        vec![Action::SpeakNextPhrase]
    }

    /// Abandon whatever is in progress and return to Idle
    pub fn reset(&mut self) {
        if self.state != ExchangeState::Idle {
            info!(from = %self.state, strikes = self.strikes, "exchange cleared");
        }
        self.timer.disarm();
        self.strikes = 0;
        self.state = ExchangeState::Idle;
    }

    /// Apply one event; anything the current state does not expect is dropped
    pub fn handle(&mut self, event: &Event, now: Instant) -> Vec<Action> {
        match (self.state, event) {
            (ExchangeState::Success | ExchangeState::Failed, _) => {
                self.transition_to(ExchangeState::Idle);
                Vec::new()
            }
            (ExchangeState::Speaking, Event::SpeechFinished) => {
                self.timer.arm(now);
                self.transition_to(ExchangeState::Listening);
                vec![Action::BeginListening]
            }
            (ExchangeState::Listening, Event::RecognitionResult { matched: true }) => {
                self.timer.disarm();
                self.transition_to(ExchangeState::Success);
                vec![Action::HardwareOn {
                    attempts: self.strikes + 1,
                }]
            }
            (ExchangeState::Listening, Event::RecognitionResult { matched: false })
            | (ExchangeState::Listening, Event::RecognitionTimeout) => {
                self.timer.disarm();
                self.strike()
            }
            _ => {
                debug!(state = %self.state, %event, "event ignored by exchange");
                Vec::new()
            }
        }
    }

    /// Synthesize a timeout if the recognition window has closed
    pub fn check_timers(&mut self, now: Instant) -> Option<Event> {
        if self.state == ExchangeState::Listening && self.timer.expired(now) {
            debug!("recognition window elapsed");
            Some(Event::RecognitionTimeout)
        } else {
            None
        }
    }

    /// Remaining recognition window, zero outside Listening
    pub fn progress(&self, now: Instant) -> f64 {
        if self.state == ExchangeState::Listening {
            self.timer.remaining(now)
        } else {
            0.0
        }
    }

    /// Count a failed attempt and resolve the transient Ack state
    fn strike(&mut self) -> Vec<Action> {
        self.strikes = (self.strikes + 1).min(MAX_STRIKES);
        self.transition_to(ExchangeState::Ack);

        let mut actions = vec![Action::AcknowledgeStrike {
            count: self.strikes,
        }];

        if self.strikes >= MAX_STRIKES {
            self.transition_to(ExchangeState::Failed);
            actions.push(Action::FailAfterMaxStrikes);
            actions.push(Action::HardwareOff);
        } else {
            self.transition_to(ExchangeState::Speaking);
            actions.push(Action::SpeakNextPhrase);
        }

        actions
    }

    fn transition_to(&mut self, new_state: ExchangeState) {
        info!(
            from = %self.state,
            to = %new_state,
            strikes = self.strikes,
            "exchange transition"
        );
        self.state = new_state;
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(RecognitionTimer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn listening(strikes: u8) -> (Exchange, Instant) {
        let now = Instant::now();
        let mut exchange = Exchange::default();
        exchange.start();
        exchange.handle(&Event::SpeechFinished, now);
        exchange.strikes = strikes;
        (exchange, now)
    }

    #[test]
    fn test_start_speaks_and_resets_strikes() {
        let mut exchange = Exchange::default();
        exchange.strikes = 2;
        let actions = exchange.start();
        assert_eq!(actions, vec![Action::SpeakNextPhrase]);
        assert_eq!(exchange.state(), ExchangeState::Speaking);
        assert_eq!(exchange.strikes(), 0);
    }

    #[test]
    fn test_start_is_not_reentrant() {
        let mut exchange = Exchange::default();
        exchange.start();
        assert!(exchange.start().is_empty());
        assert_eq!(exchange.state(), ExchangeState::Speaking);
    }

    #[test]
    fn test_speech_finished_arms_timer() {
        let (exchange, _) = listening(0);
        assert_eq!(exchange.state(), ExchangeState::Listening);
        assert!(exchange.timer().is_armed());
    }

    #[test]
    fn test_mismatch_retries_below_bound() {
        let (mut exchange, now) = listening(0);
        let actions = exchange.handle(&Event::RecognitionResult { matched: false }, now);
        assert_eq!(
            actions,
            vec![
                Action::AcknowledgeStrike { count: 1 },
                Action::SpeakNextPhrase
            ]
        );
        assert_eq!(exchange.state(), ExchangeState::Speaking);
        assert!(!exchange.timer().is_armed());
    }

    #[test]
    fn test_timeout_counts_as_strike() {
        let (mut exchange, now) = listening(1);
        let actions = exchange.handle(&Event::RecognitionTimeout, now);
        assert_eq!(actions[0], Action::AcknowledgeStrike { count: 2 });
        assert_eq!(exchange.strikes(), 2);
    }

    #[test]
    fn test_third_strike_fails() {
        let (mut exchange, now) = listening(2);
        let actions = exchange.handle(&Event::RecognitionResult { matched: false }, now);
        assert_eq!(
            actions,
            vec![
                Action::AcknowledgeStrike { count: 3 },
                Action::FailAfterMaxStrikes,
                Action::HardwareOff
            ]
        );
        assert_eq!(exchange.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_match_reports_attempt_number() {
        let (mut exchange, now) = listening(1);
        let actions = exchange.handle(&Event::RecognitionResult { matched: true }, now);
        assert_eq!(actions, vec![Action::HardwareOn { attempts: 2 }]);
        assert_eq!(exchange.state(), ExchangeState::Success);
    }

    #[test]
    fn test_terminal_recycles_on_any_event() {
        let (mut exchange, now) = listening(0);
        exchange.handle(&Event::RecognitionResult { matched: true }, now);
        assert!(exchange.handle(&Event::Tick, now).is_empty());
        assert_eq!(exchange.state(), ExchangeState::Idle);
    }

    #[test]
    fn test_timeout_synthesized_once() {
        let (mut exchange, now) = listening(0);
        let later = now + exchange.timer().window();
        assert_eq!(exchange.check_timers(later), Some(Event::RecognitionTimeout));
        assert_eq!(exchange.check_timers(later + Duration::from_secs(1)), None);
        assert_eq!(exchange.progress(later), 0.0);
    }

    #[test]
    fn test_unexpected_events_are_dropped() {
        let now = Instant::now();
        let mut exchange = Exchange::default();
        for event in [
            Event::SpeechFinished,
            Event::RecognitionResult { matched: true },
            Event::RecognitionTimeout,
            Event::HardwareAck,
        ] {
            assert!(exchange.handle(&event, now).is_empty());
            assert_eq!(exchange.state(), ExchangeState::Idle);
        }
    }
}
