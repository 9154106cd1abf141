use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DistractionKind {
    LookingDown,
    HeadTurned,
    MultipleFaces,
    PhoneDetected,
    NoFace,
    EyesClosed,
    LowFocus,
}

impl DistractionKind {
    pub const ALL: [DistractionKind; 7] = [
        DistractionKind::LookingDown,
        DistractionKind::HeadTurned,
        DistractionKind::MultipleFaces,
        DistractionKind::PhoneDetected,
        DistractionKind::NoFace,
        DistractionKind::EyesClosed,
        DistractionKind::LowFocus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistractionKind::LookingDown => "looking_down",
            DistractionKind::HeadTurned => "head_turned",
            DistractionKind::MultipleFaces => "multiple_faces",
            DistractionKind::PhoneDetected => "phone_detected",
            DistractionKind::NoFace => "no_face",
            DistractionKind::EyesClosed => "eyes_closed",
            DistractionKind::LowFocus => "low_focus",
        }
    }

    /// Label shown to the student when this kind fires.
    pub fn description(&self) -> &'static str {
        match self {
            DistractionKind::LookingDown => "Looking Down",
            DistractionKind::HeadTurned => "Head Turned Away",
            DistractionKind::MultipleFaces => "Multiple Faces Detected",
            DistractionKind::PhoneDetected => "Phone Detected",
            DistractionKind::NoFace => "No Face Detected",
            DistractionKind::EyesClosed => "Eyes Closed",
            DistractionKind::LowFocus => "Low Focus",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DistractionKind::LookingDown => 0,
            DistractionKind::HeadTurned => 1,
            DistractionKind::MultipleFaces => 2,
            DistractionKind::PhoneDetected => 3,
            DistractionKind::NoFace => 4,
            DistractionKind::EyesClosed => 5,
            DistractionKind::LowFocus => 6,
        }
    }
}

/// A discrete distraction, emitted once per rising edge of its condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistractionEvent {
    /// Seconds since session start.
    pub timestamp: f64,
    pub kind: DistractionKind,
    /// User feedback on whether the detection was right. Set at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<bool>,
}

impl DistractionEvent {
    pub fn new(timestamp: f64, kind: DistractionKind) -> Self {
        Self {
            timestamp,
            kind,
            corrected: None,
        }
    }
}

/// Running number of events per kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventCounts {
    pub looking_down_events: u32,
    pub head_turn_events: u32,
    pub multiple_face_events: u32,
    pub phone_detections: u32,
    pub no_face_events: u32,
    pub eyes_closed_events: u32,
    pub low_focus_events: u32,
}

impl EventCounts {
    fn slot(&mut self, kind: DistractionKind) -> &mut u32 {
        match kind {
            DistractionKind::LookingDown => &mut self.looking_down_events,
            DistractionKind::HeadTurned => &mut self.head_turn_events,
            DistractionKind::MultipleFaces => &mut self.multiple_face_events,
            DistractionKind::PhoneDetected => &mut self.phone_detections,
            DistractionKind::NoFace => &mut self.no_face_events,
            DistractionKind::EyesClosed => &mut self.eyes_closed_events,
            DistractionKind::LowFocus => &mut self.low_focus_events,
        }
    }

    pub fn increment(&mut self, kind: DistractionKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: DistractionKind) -> u32 {
        match kind {
            DistractionKind::LookingDown => self.looking_down_events,
            DistractionKind::HeadTurned => self.head_turn_events,
            DistractionKind::MultipleFaces => self.multiple_face_events,
            DistractionKind::PhoneDetected => self.phone_detections,
            DistractionKind::NoFace => self.no_face_events,
            DistractionKind::EyesClosed => self.eyes_closed_events,
            DistractionKind::LowFocus => self.low_focus_events,
        }
    }

    pub fn total(&self) -> u32 {
        DistractionKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}
