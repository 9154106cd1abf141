use serde::{Deserialize, Serialize};

use crate::models::SessionState;

/// Seconds spent in each session state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationLedger {
    pub focus_seconds: f64,
    pub distraction_seconds: f64,
    pub cheat_seconds: f64,
}

impl DurationLedger {
    pub fn total(&self) -> f64 {
        self.focus_seconds + self.distraction_seconds + self.cheat_seconds
    }

    fn bucket_mut(&mut self, state: SessionState) -> &mut f64 {
        match state {
            SessionState::Focused => &mut self.focus_seconds,
            SessionState::Distracted => &mut self.distraction_seconds,
            SessionState::Cheating => &mut self.cheat_seconds,
        }
    }
}

/// Owns the closed-interval ledger. The open interval lives with the state
/// machine and is only folded in here when it closes.
#[derive(Debug, Clone, Default)]
pub struct DurationAccumulator {
    ledger: DurationLedger,
}

impl DurationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished interval. Negative spans (clock skew) count as zero so
    /// the buckets never decrease.
    pub fn close_interval(&mut self, state: SessionState, elapsed: f64) {
        *self.ledger.bucket_mut(state) += elapsed.max(0.0);
    }

    /// Closed totals plus the still-open interval, without mutating anything.
    pub fn snapshot(&self, open_state: SessionState, state_start_time: f64, now: f64) -> DurationLedger {
        let mut projected = self.ledger;
        *projected.bucket_mut(open_state) += (now - state_start_time).max(0.0);
        projected
    }

    pub fn ledger(&self) -> DurationLedger {
        self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_adds_to_matching_bucket() {
        let mut acc = DurationAccumulator::new();
        acc.close_interval(SessionState::Focused, 4.0);
        acc.close_interval(SessionState::Cheating, 1.5);
        acc.close_interval(SessionState::Focused, 2.0);

        let ledger = acc.ledger();
        assert_eq!(ledger.focus_seconds, 6.0);
        assert_eq!(ledger.cheat_seconds, 1.5);
        assert_eq!(ledger.distraction_seconds, 0.0);
    }

    #[test]
    fn snapshot_projects_without_mutating() {
        let mut acc = DurationAccumulator::new();
        acc.close_interval(SessionState::Focused, 10.0);

        let projected = acc.snapshot(SessionState::Distracted, 10.0, 14.0);
        assert_eq!(projected.distraction_seconds, 4.0);
        assert_eq!(projected.total(), 14.0);

        // A second query does not double count.
        let again = acc.snapshot(SessionState::Distracted, 10.0, 14.0);
        assert_eq!(again, projected);
        assert_eq!(acc.ledger().distraction_seconds, 0.0);
    }

    #[test]
    fn negative_spans_are_ignored() {
        let mut acc = DurationAccumulator::new();
        acc.close_interval(SessionState::Focused, -3.0);
        assert_eq!(acc.ledger().focus_seconds, 0.0);
    }
}
