use crate::models::SessionState;

use super::ledger::{DurationAccumulator, DurationLedger};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub at: f64,
}

/// Session-level state machine. All times are seconds since session start.
#[derive(Debug, Clone)]
pub struct FocusStateMachine {
    state: SessionState,
    state_start_time: f64,
    accumulator: DurationAccumulator,
    session_duration: f64,
    focused_min_score: u8,
    ended_at: Option<f64>,
}

impl FocusStateMachine {
    pub fn new(session_duration: f64, focused_min_score: u8) -> Self {
        Self {
            state: SessionState::Focused,
            state_start_time: 0.0,
            accumulator: DurationAccumulator::new(),
            session_duration,
            focused_min_score,
            ended_at: None,
        }
    }

    /// An edge that fired this frame beats any score; otherwise the score
    /// splits focused from distracted.
    pub fn classify(&self, score: u8, edge_fired: bool) -> SessionState {
        if edge_fired {
            SessionState::Cheating
        } else if score >= self.focused_min_score {
            SessionState::Focused
        } else {
            SessionState::Distracted
        }
    }

    /// Evaluate one frame. Returns the transition if the state changed.
    pub fn advance(&mut self, score: u8, edge_fired: bool, now: f64) -> Option<Transition> {
        if self.is_ended() {
            return None;
        }

        let next = self.classify(score, edge_fired);
        if next == self.state {
            return None;
        }

        let transition = Transition {
            from: self.state,
            to: next,
            at: now,
        };
        self.accumulator
            .close_interval(self.state, now - self.state_start_time);
        self.state = next;
        self.state_start_time = now;

        log_debug!(
            "state {} -> {} at {:.2}s",
            transition.from.as_str(),
            transition.to.as_str(),
            now
        );
        Some(transition)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now > self.session_duration
    }

    /// Close the open interval and stop accepting frames. Calling it again
    /// keeps the first flush.
    pub fn finish(&mut self, now: f64) {
        if self.is_ended() {
            return;
        }
        self.accumulator
            .close_interval(self.state, now - self.state_start_time);
        self.state_start_time = now;
        self.ended_at = Some(now);
    }

    /// Ledger as of `now`, including the open interval. Frozen once ended.
    pub fn snapshot(&self, now: f64) -> DurationLedger {
        match self.ended_at {
            Some(_) => self.accumulator.ledger(),
            None => self
                .accumulator
                .snapshot(self.state, self.state_start_time, now),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn state_start_time(&self) -> f64 {
        self.state_start_time
    }

    pub fn session_duration(&self) -> f64 {
        self.session_duration
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn ended_at(&self) -> Option<f64> {
        self.ended_at
    }
}
