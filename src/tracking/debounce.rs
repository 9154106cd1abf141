use crate::models::{DistractionEvent, DistractionKind};
use crate::signals::DistractionConditions;

/// Rising-edge trigger for one distraction kind.
///
/// A condition held for many frames produces a single event; the flag has to
/// drop back to false before the kind can fire again.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    kind: DistractionKind,
    active: bool,
    fired: u32,
}

impl EdgeDetector {
    pub fn new(kind: DistractionKind) -> Self {
        Self {
            kind,
            active: false,
            fired: 0,
        }
    }

    pub fn observe(&mut self, condition: bool, timestamp: f64) -> Option<DistractionEvent> {
        match (self.active, condition) {
            (false, true) => {
                self.active = true;
                self.fired += 1;
                Some(DistractionEvent::new(timestamp, self.kind))
            }
            (true, false) => {
                self.active = false;
                None
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> DistractionKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of events this detector has emitted.
    pub fn fired(&self) -> u32 {
        self.fired
    }
}

/// One independent [`EdgeDetector`] per distraction kind.
#[derive(Debug, Clone)]
pub struct DebounceBank {
    detectors: [EdgeDetector; 7],
}

impl DebounceBank {
    pub fn new() -> Self {
        Self {
            detectors: DistractionKind::ALL.map(EdgeDetector::new),
        }
    }

    /// Feed every kind's condition for this frame; returns the events that
    /// fired, in `DistractionKind::ALL` order.
    pub fn observe(&mut self, conditions: &DistractionConditions, timestamp: f64) -> Vec<DistractionEvent> {
        self.detectors
            .iter_mut()
            .filter_map(|detector| {
                let condition = conditions.is_active(detector.kind());
                detector.observe(condition, timestamp)
            })
            .collect()
    }

    pub fn detector(&self, kind: DistractionKind) -> &EdgeDetector {
        &self.detectors[kind.index()]
    }
}

impl Default for DebounceBank {
    fn default() -> Self {
        Self::new()
    }
}
