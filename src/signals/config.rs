use serde::{Deserialize, Serialize};

/// Thresholds and penalties for the per-frame focus score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Coarse iris band: outside it on either axis costs `gaze_off_penalty` once.
    pub iris_outer_band: (f64, f64),
    pub gaze_off_penalty: i32,

    /// Tight iris band: outside it costs `gaze_drift_penalty` per axis,
    /// on top of the coarse penalty.
    pub iris_inner_band: (f64, f64),
    pub gaze_drift_penalty: i32,

    pub head_tilt_band: (f64, f64),
    pub head_tilt_penalty: i32,

    pub head_down_band: (f64, f64),
    pub head_down_penalty: i32,

    /// Eye aspect ratio under this counts as a closed-eye frame.
    pub blink_threshold: f64,
    /// Consecutive closed-eye frames before the score is forced to zero.
    pub blink_frames: u32,

    /// Score bands for the status label.
    pub focused_min_score: u8,
    pub distracted_min_score: u8,

    /// Consecutive frames under `distracted_min_score` before `low_focus` fires.
    pub low_focus_frames: u32,

    pub phone_label: String,
    pub phone_min_confidence: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            iris_outer_band: (0.25, 0.75),
            gaze_off_penalty: 50,
            iris_inner_band: (0.4, 0.6),
            gaze_drift_penalty: 30,
            head_tilt_band: (0.2, 1.8),
            head_tilt_penalty: 50,
            head_down_band: (0.75, 1.3),
            head_down_penalty: 50,
            blink_threshold: 0.2,
            blink_frames: 3,
            focused_min_score: 70,
            distracted_min_score: 40,
            low_focus_frames: 3,
            phone_label: "cell phone".into(),
            phone_min_confidence: 0.5,
        }
    }
}

pub(crate) fn outside(value: f64, band: (f64, f64)) -> bool {
    value < band.0 || value > band.1
}
