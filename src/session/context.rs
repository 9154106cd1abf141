use anyhow::Result;
use chrono::{DateTime, Utc};
use image::{ImageBuffer, Rgb};
use uuid::Uuid;

use crate::metrics::{SessionMetrics, SessionMetricsStore};
use crate::models::{
    DistractionEvent, Frame, FrameOutcome, FrameRecord, Observation, SessionInfo,
    SessionSummary, SkippedFrame, SESSION_ENDED_STATUS,
};
use crate::sensing::FrameAnalyzer;
use crate::settings::{EngineSettings, SessionSettings};
use crate::signals::FocusScorer;
use crate::tracking::{DebounceBank, DurationLedger, FocusStateMachine};
use crate::utils::round_to;

use super::errors::{FrameError, SessionError};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Result of the cheap pre-analysis checks on a frame.
#[derive(Debug, Clone)]
pub enum Admission {
    Accepted,
    Ended(SessionSummary),
    Skipped(SkippedFrame),
}

impl Admission {
    pub fn into_outcome(self) -> Option<FrameOutcome> {
        match self {
            Admission::Accepted => None,
            Admission::Ended(summary) => Some(FrameOutcome::Ended(summary)),
            Admission::Skipped(skipped) => Some(FrameOutcome::Skipped(skipped)),
        }
    }
}

/// Everything one session owns. Frame timestamps are on the transport's
/// clock; `origin` shifts them onto this context's clock after a reset.
pub struct SessionContext {
    id: Uuid,
    started_at: DateTime<Utc>,
    origin: f64,
    settings: SessionSettings,
    scorer: FocusScorer,
    debouncers: DebounceBank,
    machine: FocusStateMachine,
    metrics: SessionMetricsStore,
    consecutive_errors: u32,
    last_timestamp: f64,
    mock_data: bool,
}

impl SessionContext {
    pub fn new(id: Uuid, duration_secs: f64, settings: &EngineSettings, mock_data: bool) -> Self {
        Self::with_origin(id, duration_secs, 0.0, settings, mock_data)
    }

    /// A context whose clock starts at `origin` seconds of transport time.
    pub fn with_origin(
        id: Uuid,
        duration_secs: f64,
        origin: f64,
        settings: &EngineSettings,
        mock_data: bool,
    ) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            origin,
            settings: settings.session.clone(),
            scorer: FocusScorer::new(settings.scoring.clone()),
            debouncers: DebounceBank::new(),
            machine: FocusStateMachine::new(duration_secs, settings.scoring.focused_min_score),
            metrics: SessionMetricsStore::new(),
            consecutive_errors: 0,
            last_timestamp: 0.0,
            mock_data,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn duration(&self) -> f64 {
        self.machine.session_duration()
    }

    pub fn is_ended(&self) -> bool {
        self.machine.is_ended()
    }

    pub fn scores(&self) -> &[u8] {
        self.metrics.scores()
    }

    pub fn events(&self) -> &[DistractionEvent] {
        self.metrics.events()
    }

    pub fn metrics_store(&self) -> &SessionMetricsStore {
        &self.metrics
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            started_at: self.started_at,
            duration_secs: self.duration(),
            ended: self.is_ended(),
        }
    }

    /// Transport time of the last accepted frame, the origin a replacement
    /// context starts from on reset.
    pub fn transport_position(&self) -> f64 {
        self.last_timestamp + self.origin
    }

    fn local(&self, timestamp: f64) -> f64 {
        timestamp - self.origin
    }

    /// Validity, expiry and error-budget checks. Nothing that needs the
    /// models runs here.
    pub fn admit(&mut self, frame: &Frame) -> Result<Admission, SessionError> {
        if self.machine.is_ended() {
            return Ok(Admission::Ended(self.summary()));
        }

        let now = self.local(frame.timestamp);
        if !now.is_finite() || now < 0.0 || now < self.last_timestamp {
            let reason = format!(
                "timestamp {:.3}s is not after {:.3}s",
                frame.timestamp,
                self.last_timestamp + self.origin
            );
            return self.reject(FrameError::Malformed(reason)).map(Admission::Skipped);
        }

        if self.machine.is_expired(now) {
            self.machine.finish(now);
            let summary = self.summary();
            log_info!(
                "session {} ended at {:.2}s (focus {:.2}s, distraction {:.2}s, cheat {:.2}s)",
                self.id,
                summary.total_time,
                summary.focus_time,
                summary.distraction_time,
                summary.cheat_time
            );
            return Ok(Admission::Ended(summary));
        }

        if let Err(err) = self.validate_pixels(frame) {
            return self.reject(err).map(Admission::Skipped);
        }

        Ok(Admission::Accepted)
    }

    fn validate_pixels(&self, frame: &Frame) -> Result<(), FrameError> {
        let min = self.settings.min_frame_dimension;
        if frame.width < min || frame.height < min {
            return Err(FrameError::Malformed(format!(
                "frame {}x{} below {min}x{min}",
                frame.width, frame.height
            )));
        }

        ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(frame.width, frame.height, frame.pixels.as_slice())
            .map(|_| ())
            .ok_or_else(|| {
                FrameError::Malformed(format!(
                    "{} bytes cannot hold a {}x{} RGB frame",
                    frame.pixels.len(),
                    frame.width,
                    frame.height
                ))
            })
    }

    fn reject(&mut self, err: FrameError) -> Result<SkippedFrame, SessionError> {
        self.consecutive_errors += 1;
        log_warn!(
            "session {}: skipping frame ({err}), {} consecutive",
            self.id,
            self.consecutive_errors
        );

        if self.consecutive_errors >= self.settings.max_consecutive_errors {
            return Err(SessionError::TooManyConsecutiveErrors {
                count: self.consecutive_errors,
            });
        }

        Ok(SkippedFrame {
            error: err.code().to_string(),
            consecutive_errors: self.consecutive_errors,
        })
    }

    /// Full synchronous path: admit, run the models, apply.
    pub fn process_frame(&mut self, frame: &Frame, analyzer: &FrameAnalyzer) -> Result<FrameOutcome, SessionError> {
        if let Some(outcome) = self.admit(frame)?.into_outcome() {
            return Ok(outcome);
        }
        let analysis = analyzer.analyze(frame);
        self.apply(frame, analysis)
    }

    /// Apply model output computed elsewhere. The frame is re-admitted since
    /// the session may have ended or been reset while the models ran.
    pub fn ingest(&mut self, frame: &Frame, analysis: Result<Observation>) -> Result<FrameOutcome, SessionError> {
        if let Some(outcome) = self.admit(frame)?.into_outcome() {
            return Ok(outcome);
        }
        self.apply(frame, analysis)
    }

    fn apply(&mut self, frame: &Frame, analysis: Result<Observation>) -> Result<FrameOutcome, SessionError> {
        let observation = match analysis {
            Ok(observation) => observation,
            Err(err) => {
                return self
                    .reject(FrameError::AnalysisFailed(format!("{err:#}")))
                    .map(FrameOutcome::Skipped);
            }
        };

        let scored = match self.scorer.score(frame.width, frame.height, &observation) {
            Ok(scored) => scored,
            Err(err) => {
                return self
                    .reject(FrameError::Malformed(err.to_string()))
                    .map(FrameOutcome::Skipped);
            }
        };

        self.consecutive_errors = 0;
        let now = self.local(frame.timestamp);

        let fired = self.debouncers.observe(&scored.conditions, now);
        for event in &fired {
            log_info!(
                "session {}: {} at {:.2}s",
                self.id,
                event.kind.description(),
                event.timestamp
            );
            self.metrics.record_event(event.clone());
        }

        self.machine.advance(scored.score, !fired.is_empty(), now);
        self.metrics.record_score(scored.score);
        self.last_timestamp = now;

        let ledger = self.machine.snapshot(now);
        let counts = self.metrics.counts();
        Ok(FrameOutcome::Record(FrameRecord {
            score: scored.score,
            status: scored.status,
            state: self.machine.state(),
            timestamp: round_to(now, 2),
            focus_time: round_to(ledger.focus_seconds, 2),
            distraction_time: round_to(ledger.distraction_seconds, 2),
            cheat_time: round_to(ledger.cheat_seconds, 2),
            total_time: round_to(now, 2),
            counts,
            cheat_count: counts.total(),
            events: fired,
            mock_data: self.mock_data,
        }))
    }

    /// The instant a query or flush refers to: the transport clock, never
    /// before the last accepted frame and never past the configured end.
    fn query_instant(&self, transport_now: f64) -> f64 {
        match self.machine.ended_at() {
            Some(ended_at) => ended_at,
            None => {
                let now = self.local(transport_now);
                let now = if now.is_finite() { now } else { self.last_timestamp };
                now.max(self.last_timestamp).min(self.duration().max(self.last_timestamp))
            }
        }
    }

    /// Close the open interval (disconnect, stop, fatal error). Idempotent.
    pub fn finalize(&mut self, transport_now: f64) -> SessionSummary {
        if !self.machine.is_ended() {
            let at = self.query_instant(transport_now);
            self.machine.finish(at);
            log_info!("session {} finalized at {:.2}s", self.id, at);
        }
        self.summary()
    }

    pub fn ledger(&self, transport_now: f64) -> DurationLedger {
        self.machine.snapshot(self.query_instant(transport_now))
    }

    pub fn time_metrics(&self, transport_now: f64) -> SessionMetrics {
        let now = self.query_instant(transport_now);
        SessionMetrics::new(
            &self.machine.snapshot(now),
            now,
            self.metrics.counts(),
            self.metrics.average_score(),
            self.mock_data,
        )
    }

    /// Elapsed seconds covered so far on this context's clock.
    pub fn elapsed(&self, transport_now: f64) -> f64 {
        self.query_instant(transport_now)
    }

    pub fn record_feedback(&mut self, index: usize, accurate: bool) -> Result<()> {
        self.metrics.record_feedback(index, accurate)
    }

    pub fn summary(&self) -> SessionSummary {
        let total = self.machine.ended_at().unwrap_or(self.last_timestamp);
        let ledger = self.machine.snapshot(total);
        SessionSummary {
            status: SESSION_ENDED_STATUS.to_string(),
            focus_time: round_to(ledger.focus_seconds, 2),
            distraction_time: round_to(ledger.distraction_seconds, 2),
            cheat_time: round_to(ledger.cheat_seconds, 2),
            total_time: round_to(total, 2),
        }
    }
}
