mod types;

pub use types::SessionMetrics;

use anyhow::{anyhow, bail, Result};

use crate::models::{DistractionEvent, DistractionKind, EventCounts};

/// Append-only per-session history: one score per processed frame and every
/// distraction event, with running per-kind counters.
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsStore {
    scores: Vec<u8>,
    score_sum: u64,
    events: Vec<DistractionEvent>,
    counts: EventCounts,
}

impl SessionMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_score(&mut self, score: u8) {
        self.scores.push(score);
        self.score_sum += u64::from(score);
    }

    pub fn record_event(&mut self, event: DistractionEvent) {
        self.counts.increment(event.kind);
        self.events.push(event);
    }

    pub fn scores(&self) -> &[u8] {
        &self.scores
    }

    pub fn events(&self) -> &[DistractionEvent] {
        &self.events
    }

    pub fn counts(&self) -> EventCounts {
        self.counts
    }

    pub fn count(&self, kind: DistractionKind) -> u32 {
        self.counts.get(kind)
    }

    /// Mean of all scores, 0 for an empty series.
    pub fn average_score(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.score_sum as f64 / self.scores.len() as f64
        }
    }

    /// Event times and kinds as two parallel columns, the shape the chart
    /// layer pairs back together.
    pub fn event_columns(&self) -> (Vec<f64>, Vec<DistractionKind>) {
        self.events
            .iter()
            .map(|event| (event.timestamp, event.kind))
            .unzip()
    }

    /// Attach user feedback to an event. Each event takes feedback once.
    pub fn record_feedback(&mut self, index: usize, accurate: bool) -> Result<()> {
        let event = self
            .events
            .get_mut(index)
            .ok_or_else(|| anyhow!("no event at index {index}"))?;
        if event.corrected.is_some() {
            bail!("event {index} already has feedback");
        }
        event.corrected = Some(accurate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_averages_to_zero() {
        let store = SessionMetricsStore::new();
        assert_eq!(store.average_score(), 0.0);
        assert!(store.scores().is_empty());
        assert_eq!(store.counts().total(), 0);
    }

    #[test]
    fn scores_keep_insertion_order() {
        let mut store = SessionMetricsStore::new();
        for score in [100, 0, 50, 70] {
            store.record_score(score);
        }
        assert_eq!(store.scores(), &[100, 0, 50, 70]);
        assert_eq!(store.average_score(), 55.0);
    }

    #[test]
    fn events_update_running_counts() {
        let mut store = SessionMetricsStore::new();
        store.record_event(DistractionEvent::new(1.0, DistractionKind::PhoneDetected));
        store.record_event(DistractionEvent::new(2.0, DistractionKind::NoFace));
        store.record_event(DistractionEvent::new(3.0, DistractionKind::PhoneDetected));

        assert_eq!(store.count(DistractionKind::PhoneDetected), 2);
        assert_eq!(store.count(DistractionKind::NoFace), 1);

        let (times, kinds) = store.event_columns();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        assert_eq!(kinds[1], DistractionKind::NoFace);
    }

    #[test]
    fn feedback_is_accepted_once() {
        let mut store = SessionMetricsStore::new();
        store.record_event(DistractionEvent::new(1.0, DistractionKind::LookingDown));

        store.record_feedback(0, false).unwrap();
        assert_eq!(store.events()[0].corrected, Some(false));
        assert!(store.record_feedback(0, true).is_err());
        assert!(store.record_feedback(5, true).is_err());
    }
}
