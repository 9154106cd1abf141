use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::DistractionKind;
use crate::utils::round_to;

/// Presentation knobs for post-session charts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    /// Trailing moving-average window, current sample included.
    pub smoothing_window: usize,
    /// Scores strictly above this land in the focused slice.
    pub focused_split_above: u8,
    /// Placeholder series used when the live one cannot be charted.
    pub synthetic_samples: usize,
    pub synthetic_duration_secs: f64,
    pub synthetic_score_range: (u8, u8),
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 10,
            focused_split_above: 40,
            synthetic_samples: 60,
            synthetic_duration_secs: 1800.0,
            synthetic_score_range: (60, 100),
        }
    }
}

impl ChartConfig {
    pub fn validate(&self) -> Result<()> {
        let (low, high) = self.synthetic_score_range;
        if low > high || high > 100 {
            bail!("synthetic_score_range ({low}, {high}) must be ordered within 0..=100");
        }
        if self.synthetic_samples == 0 {
            bail!("synthetic_samples must be at least 1");
        }
        if !self.synthetic_duration_secs.is_finite() || self.synthetic_duration_secs <= 0.0 {
            bail!(
                "synthetic_duration_secs must be positive, got {}",
                self.synthetic_duration_secs
            );
        }
        if self.smoothing_window == 0 {
            bail!("smoothing_window must be at least 1");
        }
        Ok(())
    }

    /// Coerce into a usable config: order and cap the score range, and swap
    /// unusable sizes for the defaults.
    fn normalized(mut self) -> Self {
        let defaults = Self::default();
        let (a, b) = self.synthetic_score_range;
        self.synthetic_score_range = (a.min(b).min(100), a.max(b).min(100));
        if self.synthetic_samples == 0 {
            self.synthetic_samples = defaults.synthetic_samples;
        }
        if !self.synthetic_duration_secs.is_finite() || self.synthetic_duration_secs <= 0.0 {
            self.synthetic_duration_secs = defaults.synthetic_duration_secs;
        }
        if self.smoothing_window == 0 {
            self.smoothing_window = defaults.smoothing_window;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartPoint {
    pub time: u64,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FocusTrend {
    pub chart_data: Vec<ChartPoint>,
    pub session_duration: f64,
    /// True when the placeholder series was charted instead of live data.
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EventPoint {
    pub time: f64,
    pub event: DistractionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventTimeline {
    pub chart_data: Vec<EventPoint>,
    pub session_duration: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FocusSplit {
    pub focus_pie: usize,
    pub cheat_pie: usize,
}

/// Read-only shaping of a session's history for charts. Never touches live
/// session state.
#[derive(Debug, Clone, Default)]
pub struct ChartAggregator {
    config: ChartConfig,
}

impl ChartAggregator {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    /// A series is not chartable when it is empty, has a single distinct
    /// value, or covers no time.
    pub fn needs_substitute(scores: &[u8], duration: f64) -> bool {
        let flat = scores.windows(2).all(|pair| pair[0] == pair[1]);
        scores.is_empty() || flat || duration <= 0.0
    }

    pub fn focus_trend<R: Rng>(&self, scores: &[u8], duration: f64, rng: &mut R) -> FocusTrend {
        if Self::needs_substitute(scores, duration) {
            let (low, high) = self.config.synthetic_score_range;
            let synthetic: Vec<u8> = (0..self.config.synthetic_samples)
                .map(|_| rng.gen_range(low..=high))
                .collect();
            let duration = self.config.synthetic_duration_secs;
            return FocusTrend {
                chart_data: self.smooth(&synthetic, duration),
                session_duration: duration,
                synthetic: true,
            };
        }

        FocusTrend {
            chart_data: self.smooth(scores, duration),
            session_duration: duration,
            synthetic: false,
        }
    }

    fn smooth(&self, scores: &[u8], duration: f64) -> Vec<ChartPoint> {
        let n = scores.len();
        let window = self.config.smoothing_window.max(1);

        (0..n)
            .map(|i| {
                let start = (i + 1).saturating_sub(window);
                let slice = &scores[start..=i];
                let sum: u32 = slice.iter().map(|s| u32::from(*s)).sum();
                let avg = f64::from(sum) / slice.len() as f64;
                ChartPoint {
                    time: (i as f64 * duration / n as f64).round() as u64,
                    score: avg.round().clamp(0.0, 100.0) as u8,
                }
            })
            .collect()
    }

    /// Pair event times with kinds. Mismatched columns are cut to the
    /// shorter one.
    pub fn event_timeline(&self, times: &[f64], kinds: &[DistractionKind], duration: f64) -> EventTimeline {
        let chart_data = times
            .iter()
            .zip(kinds)
            .map(|(time, kind)| EventPoint {
                time: round_to(*time, 2),
                event: *kind,
            })
            .collect();

        EventTimeline {
            chart_data,
            session_duration: duration,
        }
    }

    pub fn focus_split(&self, scores: &[u8]) -> FocusSplit {
        let focused = scores
            .iter()
            .filter(|score| **score > self.config.focused_split_above)
            .count();
        FocusSplit {
            focus_pie: focused,
            cheat_pie: scores.len() - focused,
        }
    }
}
