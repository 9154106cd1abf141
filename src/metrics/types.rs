use serde::{Deserialize, Serialize};

use crate::models::EventCounts;
use crate::tracking::DurationLedger;
use crate::utils::round_to;

/// Aggregate view of a session at a query instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMetrics {
    pub focus_time: f64,
    pub distraction_time: f64,
    pub cheat_time: f64,
    pub total_time: f64,
    pub focus_percentage: f64,
    pub distraction_percentage: f64,
    pub cheat_percentage: f64,
    #[serde(flatten)]
    pub counts: EventCounts,
    pub total_cheat_events: u32,
    pub avg_focus_score: f64,
    pub mock_data: bool,
}

impl SessionMetrics {
    pub fn new(
        ledger: &DurationLedger,
        elapsed: f64,
        counts: EventCounts,
        avg_focus_score: f64,
        mock_data: bool,
    ) -> Self {
        let percent = |part: f64| {
            if elapsed > 0.0 {
                round_to(part / elapsed * 100.0, 1)
            } else {
                0.0
            }
        };

        Self {
            focus_time: round_to(ledger.focus_seconds, 2),
            distraction_time: round_to(ledger.distraction_seconds, 2),
            cheat_time: round_to(ledger.cheat_seconds, 2),
            total_time: round_to(elapsed, 2),
            focus_percentage: percent(ledger.focus_seconds),
            distraction_percentage: percent(ledger.distraction_seconds),
            cheat_percentage: percent(ledger.cheat_seconds),
            total_cheat_events: counts.total(),
            counts,
            avg_focus_score: round_to(avg_focus_score, 1),
            mock_data,
        }
    }
}
