//! Typing debouncer: raw edit pulses to a strict start/stop signal pair.
//!
//! [`TypingDebouncer`] holds no timer of its own. It records a single idle
//! deadline that the driver sleeps on and reports back through
//! [`expire`](TypingDebouncer::expire). Restarting the deadline replaces the
//! previous one, and cancelling it is an explicit operation.
//!
//! Consecutive emitted intents always alternate between `isTyping: true` and
//! `isTyping: false`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::protocol::ClientMessage;

/// Default idle period after the last edit before typing is reported stopped.
pub const DEFAULT_TYPING_IDLE_TIMEOUT: Duration = Duration::from_millis(900);

/// Local typing activity as last reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypingState {
    pub is_typing: bool,
    /// When `is_typing` last flipped. `None` until the first transition.
    pub last_change_at: Option<Instant>,
}

/// Debounces edit pulses into `typing` intents.
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    state: TypingState,
    idle_timeout: Duration,
    deadline: Option<Instant>,
    /// Pulses are ignored unless the connection is open.
    active: bool,
}

impl TypingDebouncer {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            state: TypingState::default(),
            idle_timeout,
            deadline: None,
            active: false,
        }
    }

    pub fn state(&self) -> TypingState {
        self.state
    }

    pub fn is_typing(&self) -> bool {
        self.state.is_typing
    }

    /// When the pending idle timer fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Accept pulses. Called once the connection is open.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Stop accepting pulses and drop all state without emitting.
    ///
    /// Called when the connection closes: nothing can be delivered any more,
    /// and a stale timer must not survive into the next session.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.deadline = None;
        self.state = TypingState::default();
    }

    /// Record one edit pulse.
    ///
    /// Emits `isTyping: true` only on the idle → typing transition, and
    /// (re)starts the idle timer on every pulse.
    pub fn pulse(&mut self, now: Instant) -> Option<ClientMessage> {
        if !self.active {
            trace!("typing pulse ignored while inactive");
            return None;
        }
        self.deadline = Some(now + self.idle_timeout);
        if self.state.is_typing {
            return None;
        }
        Some(self.transition(true, now))
    }

    /// Fire the idle timer if its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<ClientMessage> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                if self.state.is_typing {
                    Some(self.transition(false, now))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// A message was sent: stop immediately and cancel the idle timer.
    pub fn stop(&mut self, now: Instant) -> Option<ClientMessage> {
        self.deadline = None;
        if !self.state.is_typing {
            return None;
        }
        Some(self.transition(false, now))
    }

    fn transition(&mut self, is_typing: bool, now: Instant) -> ClientMessage {
        self.state = TypingState {
            is_typing,
            last_change_at: Some(now),
        };
        ClientMessage::Typing { is_typing }
    }
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    const START: ClientMessage = ClientMessage::Typing { is_typing: true };
    const STOP: ClientMessage = ClientMessage::Typing { is_typing: false };

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn active() -> TypingDebouncer {
        let mut debouncer = TypingDebouncer::default();
        debouncer.activate();
        debouncer
    }

    #[test]
    fn rapid_pulses_emit_a_single_start() {
        let t0 = Instant::now();
        let mut d = active();

        let mut emitted = Vec::new();
        for i in 0..20 {
            let now = t0 + ms(i * 899);
            emitted.extend(d.expire(now));
            emitted.extend(d.pulse(now));
        }
        assert_eq!(emitted, vec![START]);
        assert!(d.is_typing());
    }

    #[test]
    fn idle_gap_emits_stop_then_next_pulse_restarts() {
        let t0 = Instant::now();
        let mut d = active();

        assert_eq!(d.pulse(t0), Some(START));
        assert_eq!(d.deadline(), Some(t0 + ms(900)));

        assert_eq!(d.expire(t0 + ms(899)), None);
        assert_eq!(d.expire(t0 + ms(900)), Some(STOP));
        assert_eq!(d.deadline(), None);
        assert_eq!(d.expire(t0 + ms(5000)), None);

        assert_eq!(d.pulse(t0 + ms(5000)), Some(START));
    }

    #[test]
    fn pulse_restarts_the_single_timer() {
        let t0 = Instant::now();
        let mut d = active();
        d.pulse(t0);
        d.pulse(t0 + ms(500));
        assert_eq!(d.deadline(), Some(t0 + ms(1400)));
        assert_eq!(d.expire(t0 + ms(900)), None);
        assert_eq!(d.expire(t0 + ms(1400)), Some(STOP));
    }

    #[test]
    fn stop_forces_immediate_stop_and_cancels_timer() {
        let t0 = Instant::now();
        let mut d = active();
        d.pulse(t0);

        assert_eq!(d.stop(t0 + ms(100)), Some(STOP));
        assert_eq!(d.deadline(), None);
        assert_eq!(d.expire(t0 + ms(2000)), None);
        assert_eq!(d.state().last_change_at, Some(t0 + ms(100)));

        // No further start until a new pulse.
        assert_eq!(d.pulse(t0 + ms(3000)), Some(START));
    }

    #[test]
    fn stop_when_idle_emits_nothing() {
        let mut d = active();
        assert_eq!(d.stop(Instant::now()), None);
    }

    #[test]
    fn inactive_debouncer_ignores_pulses() {
        let mut d = TypingDebouncer::default();
        assert_eq!(d.pulse(Instant::now()), None);
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn deactivate_drops_pending_timer_without_emitting() {
        let t0 = Instant::now();
        let mut d = active();
        d.pulse(t0);

        d.deactivate();
        assert!(!d.is_typing());
        assert_eq!(d.deadline(), None);
        assert_eq!(d.expire(t0 + ms(2000)), None);
        assert_eq!(d.pulse(t0 + ms(2000)), None);
        assert_eq!(d.deadline(), None, "no stale timer restarted");
    }

    #[test]
    fn emitted_values_alternate() {
        let t0 = Instant::now();
        let mut d = active();
        let mut emitted = Vec::new();
        let script: &[(u64, &str)] = &[
            (0, "pulse"),
            (100, "pulse"),
            (1000, "expire"),
            (1100, "stop"),
            (1200, "pulse"),
            (1300, "stop"),
            (1400, "stop"),
            (1500, "pulse"),
            (2400, "expire"),
        ];
        for &(at, op) in script {
            let now = t0 + ms(at);
            let out = match op {
                "pulse" => d.pulse(now),
                "expire" => d.expire(now),
                _ => d.stop(now),
            };
            emitted.extend(out);
        }
        assert_eq!(emitted, vec![START, STOP, START, STOP, START, STOP]);
    }
}
