use crate::models::{Detection, DistractionKind, FocusStatus, Observation};

use super::config::{outside, ScoringConfig};
use super::features::{FeatureError, GeometricFeatureExtractor, GeometricSignals};

const MAX_SCORE: i32 = 100;

/// Raw per-frame distraction conditions, one flag per kind. These are levels,
/// not events; the debouncers turn them into edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistractionConditions([bool; 7]);

impl DistractionConditions {
    pub fn set(&mut self, kind: DistractionKind, active: bool) {
        self.0[kind.index()] = active;
    }

    pub fn is_active(&self, kind: DistractionKind) -> bool {
        self.0[kind.index()]
    }

    pub fn active(&self) -> impl Iterator<Item = DistractionKind> + '_ {
        DistractionKind::ALL
            .into_iter()
            .filter(move |kind| self.is_active(*kind))
    }
}

#[derive(Debug, Clone)]
pub struct FrameScore {
    pub score: u8,
    pub status: FocusStatus,
    pub conditions: DistractionConditions,
    /// `None` when no face was found.
    pub signals: Option<GeometricSignals>,
}

/// Turns one frame's observation into a 0-100 score.
///
/// Stateful only across frames for the blink counter and the low-score
/// streak; everything else is recomputed per frame.
#[derive(Debug, Clone)]
pub struct FocusScorer {
    config: ScoringConfig,
    blink_counter: u32,
    low_score_streak: u32,
}

impl FocusScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            blink_counter: 0,
            low_score_streak: 0,
        }
    }

    pub fn blink_counter(&self) -> u32 {
        self.blink_counter
    }

    /// Score a frame. Only a face mesh with missing points is an error; a
    /// missing face is a defined outcome (score 0, "No face detected").
    pub fn score(
        &mut self,
        width: u32,
        height: u32,
        observation: &Observation,
    ) -> Result<FrameScore, FeatureError> {
        let phone = self.phone_present(&observation.detections);

        let mut conditions = DistractionConditions::default();
        conditions.set(DistractionKind::PhoneDetected, phone);
        conditions.set(DistractionKind::MultipleFaces, observation.face_count() > 1);

        let Some(face) = observation.primary_face() else {
            conditions.set(DistractionKind::NoFace, true);
            self.low_score_streak = 0;
            let status = if phone {
                FocusStatus::PhoneDetected
            } else {
                FocusStatus::NoFace
            };
            return Ok(FrameScore {
                score: 0,
                status,
                conditions,
                signals: None,
            });
        };

        let signals = GeometricFeatureExtractor::new(width, height).extract(face)?;

        let eyes_closed = self.track_blink(signals.eye_aspect_ratio);
        conditions.set(DistractionKind::EyesClosed, eyes_closed);
        conditions.set(
            DistractionKind::HeadTurned,
            outside(signals.head_tilt, self.config.head_tilt_band),
        );
        conditions.set(
            DistractionKind::LookingDown,
            outside(signals.head_down, self.config.head_down_band),
        );

        let (score, status) = if phone {
            self.low_score_streak = 0;
            (0, FocusStatus::PhoneDetected)
        } else if eyes_closed {
            self.low_score_streak = 0;
            (0, FocusStatus::EyesClosed)
        } else {
            let score = self.penalized_score(&signals);
            if score < self.config.distracted_min_score {
                self.low_score_streak = self.low_score_streak.saturating_add(1);
            } else {
                self.low_score_streak = 0;
            }
            (score, self.status_for(score))
        };

        conditions.set(
            DistractionKind::LowFocus,
            self.low_score_streak >= self.config.low_focus_frames,
        );

        Ok(FrameScore {
            score,
            status,
            conditions,
            signals: Some(signals),
        })
    }

    fn phone_present(&self, detections: &[Detection]) -> bool {
        detections.iter().any(|detection| {
            detection.label == self.config.phone_label
                && detection.confidence > self.config.phone_min_confidence
        })
    }

    /// Returns true once enough consecutive low-EAR frames have been seen.
    fn track_blink(&mut self, eye_aspect_ratio: f64) -> bool {
        if eye_aspect_ratio < self.config.blink_threshold {
            self.blink_counter = self.blink_counter.saturating_add(1);
        } else {
            self.blink_counter = 0;
        }
        self.blink_counter >= self.config.blink_frames
    }

    fn penalized_score(&self, signals: &GeometricSignals) -> u8 {
        let cfg = &self.config;
        let mut score = MAX_SCORE;

        if outside(signals.iris_x, cfg.iris_outer_band) || outside(signals.iris_y, cfg.iris_outer_band) {
            score -= cfg.gaze_off_penalty;
        }
        if outside(signals.head_tilt, cfg.head_tilt_band) {
            score -= cfg.head_tilt_penalty;
        }
        if outside(signals.head_down, cfg.head_down_band) {
            score -= cfg.head_down_penalty;
        }
        if outside(signals.iris_x, cfg.iris_inner_band) {
            score -= cfg.gaze_drift_penalty;
        }
        if outside(signals.iris_y, cfg.iris_inner_band) {
            score -= cfg.gaze_drift_penalty;
        }

        score.clamp(0, MAX_SCORE) as u8
    }

    fn status_for(&self, score: u8) -> FocusStatus {
        if score >= self.config.focused_min_score {
            FocusStatus::Focused
        } else if score >= self.config.distracted_min_score {
            FocusStatus::SlightlyDistracted
        } else {
            FocusStatus::Distracted
        }
    }
}

impl Default for FocusScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, LandmarkSet, Point};
    use crate::signals::features::{mesh, tests::frontal_face};
    use proptest::prelude::*;

    const W: u32 = 640;
    const H: u32 = 480;

    fn observe(face: LandmarkSet) -> Observation {
        Observation {
            faces: vec![face],
            detections: Vec::new(),
        }
    }

    fn phone(confidence: f32) -> Detection {
        Detection::new(
            "cell phone",
            confidence,
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
        )
    }

    /// Move both irises to the given position inside their eye boxes.
    fn with_iris(mut face: LandmarkSet, x: f64, y: f64) -> LandmarkSet {
        for (iris, x0) in [(mesh::LEFT_IRIS_CENTER, 100.0), (mesh::RIGHT_IRIS_CENTER, 200.0)] {
            face.insert(iris, Point::new(x0 + 40.0 * x, 92.0 + 16.0 * y));
        }
        face
    }

    /// Squash both eyes' lids so EAR drops to 0.1.
    fn closed_eyes(mut face: LandmarkSet) -> LandmarkSet {
        for (ear, x0) in [(mesh::LEFT_EYE_EAR, 100.0), (mesh::RIGHT_EYE_EAR, 200.0)] {
            face.insert(ear[1], Point::new(x0 + 13.0, 98.0));
            face.insert(ear[2], Point::new(x0 + 27.0, 98.0));
            face.insert(ear[4], Point::new(x0 + 27.0, 102.0));
            face.insert(ear[5], Point::new(x0 + 13.0, 102.0));
        }
        face
    }

    #[test]
    fn attentive_face_scores_full_marks() {
        let mut scorer = FocusScorer::default();
        let result = scorer.score(W, H, &observe(frontal_face())).unwrap();

        assert_eq!(result.score, 100);
        assert_eq!(result.status, FocusStatus::Focused);
        assert_eq!(result.conditions.active().count(), 0);
    }

    #[test]
    fn tight_band_costs_thirty_per_axis() {
        let mut scorer = FocusScorer::default();
        let result = scorer
            .score(W, H, &observe(with_iris(frontal_face(), 0.65, 0.5)))
            .unwrap();
        assert_eq!(result.score, 70);

        let result = scorer
            .score(W, H, &observe(with_iris(frontal_face(), 0.65, 0.35)))
            .unwrap();
        assert_eq!(result.score, 40);
        assert_eq!(result.status, FocusStatus::SlightlyDistracted);
    }

    #[test]
    fn coarse_and_tight_bands_stack() {
        let mut scorer = FocusScorer::default();
        let result = scorer
            .score(W, H, &observe(with_iris(frontal_face(), 0.9, 0.5)))
            .unwrap();
        // -50 coarse, -30 tight on x.
        assert_eq!(result.score, 20);
        assert_eq!(result.status, FocusStatus::Distracted);
    }

    #[test]
    fn score_floors_at_zero_with_every_penalty() {
        let mut face = with_iris(frontal_face(), 0.95, 0.05);
        face.insert(mesh::LEFT_TEMPLE, Point::new(155.0, 150.0));
        face.insert(mesh::CHIN, Point::new(160.0, 160.0));

        let mut scorer = FocusScorer::default();
        let result = scorer.score(W, H, &observe(face)).unwrap();
        assert_eq!(result.score, 0);
        assert!(result.conditions.is_active(DistractionKind::HeadTurned));
        assert!(result.conditions.is_active(DistractionKind::LookingDown));
    }

    #[test]
    fn three_closed_frames_force_zero() {
        let mut scorer = FocusScorer::default();
        let closed = observe(closed_eyes(frontal_face()));

        for _ in 0..2 {
            let result = scorer.score(W, H, &closed).unwrap();
            assert_ne!(result.status, FocusStatus::EyesClosed);
            assert!(!result.conditions.is_active(DistractionKind::EyesClosed));
        }

        let result = scorer.score(W, H, &closed).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.status, FocusStatus::EyesClosed);
        assert!(result.conditions.is_active(DistractionKind::EyesClosed));
    }

    #[test]
    fn open_frame_resets_blink_counter() {
        let mut scorer = FocusScorer::default();
        let closed = observe(closed_eyes(frontal_face()));
        let open = observe(frontal_face());

        scorer.score(W, H, &closed).unwrap();
        scorer.score(W, H, &closed).unwrap();
        scorer.score(W, H, &open).unwrap();
        assert_eq!(scorer.blink_counter(), 0);

        for _ in 0..2 {
            let result = scorer.score(W, H, &closed).unwrap();
            assert_ne!(result.status, FocusStatus::EyesClosed);
            assert!(!result.conditions.is_active(DistractionKind::EyesClosed));
        }
        let result = scorer.score(W, H, &closed).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.status, FocusStatus::EyesClosed);

        let result = scorer.score(W, H, &open).unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(scorer.blink_counter(), 0);
    }

    #[test]
    fn phone_overrides_everything() {
        let mut scorer = FocusScorer::default();
        let mut observation = observe(frontal_face());
        observation.detections.push(phone(0.9));

        let result = scorer.score(W, H, &observation).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.status, FocusStatus::PhoneDetected);
        assert!(result.conditions.is_active(DistractionKind::PhoneDetected));
    }

    #[test]
    fn weak_phone_detection_is_ignored() {
        let mut scorer = FocusScorer::default();
        let mut observation = observe(frontal_face());
        observation.detections.push(phone(0.5));

        let result = scorer.score(W, H, &observation).unwrap();
        assert_eq!(result.score, 100);
    }

    #[test]
    fn missing_face_short_circuits() {
        let mut scorer = FocusScorer::default();
        let result = scorer.score(W, H, &Observation::default()).unwrap();

        assert_eq!(result.score, 0);
        assert_eq!(result.status, FocusStatus::NoFace);
        assert!(result.conditions.is_active(DistractionKind::NoFace));
        assert!(result.signals.is_none());
    }

    #[test]
    fn second_face_raises_multiple_faces() {
        let mut scorer = FocusScorer::default();
        let observation = Observation {
            faces: vec![frontal_face(), frontal_face()],
            detections: Vec::new(),
        };
        let result = scorer.score(W, H, &observation).unwrap();
        assert!(result.conditions.is_active(DistractionKind::MultipleFaces));
        assert_eq!(result.score, 100);
    }

    #[test]
    fn sustained_low_score_raises_low_focus() {
        let mut scorer = FocusScorer::default();
        let away = observe(with_iris(frontal_face(), 0.9, 0.5));

        assert!(!scorer.score(W, H, &away).unwrap().conditions.is_active(DistractionKind::LowFocus));
        assert!(!scorer.score(W, H, &away).unwrap().conditions.is_active(DistractionKind::LowFocus));
        assert!(scorer.score(W, H, &away).unwrap().conditions.is_active(DistractionKind::LowFocus));

        let back = scorer.score(W, H, &observe(frontal_face())).unwrap();
        assert!(!back.conditions.is_active(DistractionKind::LowFocus));
    }

    proptest! {
        #[test]
        fn score_stays_in_range(
            ix in -1.0f64..2.0,
            iy in -1.0f64..2.0,
            temple in 81.0f64..159.0,
            chin in 151.0f64..400.0,
        ) {
            let mut face = with_iris(frontal_face(), ix, iy);
            face.insert(mesh::LEFT_TEMPLE, Point::new(temple, 150.0));
            face.insert(mesh::CHIN, Point::new(160.0, chin));

            let mut scorer = FocusScorer::default();
            let result = scorer.score(W, H, &observe(face)).unwrap();
            prop_assert!(result.score <= 100);
        }
    }
}
