use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DistractionEvent, EventCounts};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Focused,
    Distracted,
    Cheating,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Focused => "focused",
            SessionState::Distracted => "distracted",
            SessionState::Cheating => "cheating",
        }
    }
}

/// Per-frame status label produced by the scorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FocusStatus {
    #[serde(rename = "Focused")]
    Focused,
    #[serde(rename = "Slightly Distracted")]
    SlightlyDistracted,
    #[serde(rename = "Distracted")]
    Distracted,
    #[serde(rename = "Eyes Closed")]
    EyesClosed,
    #[serde(rename = "Phone Detected")]
    PhoneDetected,
    #[serde(rename = "No face detected")]
    NoFace,
}

/// What the engine reports for every accepted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub score: u8,
    pub status: FocusStatus,
    pub state: SessionState,
    pub timestamp: f64,
    pub focus_time: f64,
    pub distraction_time: f64,
    pub cheat_time: f64,
    pub total_time: f64,
    #[serde(flatten)]
    pub counts: EventCounts,
    pub cheat_count: u32,
    /// Events that fired on this frame.
    pub events: Vec<DistractionEvent>,
    pub mock_data: bool,
}

pub const SESSION_ENDED_STATUS: &str = "Session Ended";

/// Terminal record once the configured duration has passed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub status: String,
    pub focus_time: f64,
    pub distraction_time: f64,
    pub cheat_time: f64,
    pub total_time: f64,
}

/// A frame that was dropped without touching session state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedFrame {
    pub error: String,
    pub consecutive_errors: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameOutcome {
    Record(FrameRecord),
    Ended(SessionSummary),
    Skipped(SkippedFrame),
}

impl FrameOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FrameOutcome::Ended(_))
    }

    pub fn record(&self) -> Option<&FrameRecord> {
        match self {
            FrameOutcome::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Registry listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub ended: bool,
}
