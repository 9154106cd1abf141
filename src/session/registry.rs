use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, Context, Result};
use log::info;
use tokio::{
    sync::{mpsc, Mutex},
    time::{Duration, Instant},
};
use uuid::Uuid;

use crate::charts::{ChartAggregator, EventTimeline, FocusSplit, FocusTrend};
use crate::metrics::SessionMetrics;
use crate::models::{DistractionEvent, Frame, FrameOutcome, SessionInfo, SessionSummary};
use crate::sensing::{FrameAnalyzer, SessionWorker};
use crate::settings::EngineSettings;

use super::{SessionContext, SessionError};

/// What a transport needs to stream one session.
pub struct SessionHandle {
    pub id: Uuid,
    pub frames: mpsc::Sender<Frame>,
    pub outcomes: mpsc::Receiver<FrameOutcome>,
}

struct SessionEntry {
    context: Arc<Mutex<SessionContext>>,
    worker: SessionWorker,
    clock: Instant,
}

impl SessionEntry {
    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }
}

/// Every live and finished session, keyed by id. Contexts stay queryable
/// after their loop stops until they are removed.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    settings: Arc<EngineSettings>,
    analyzer: FrameAnalyzer,
    charts: ChartAggregator,
}

impl SessionRegistry {
    pub fn new(settings: EngineSettings, analyzer: FrameAnalyzer) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            charts: ChartAggregator::new(settings.charts.clone()),
            settings: Arc::new(settings),
            analyzer,
        }
    }

    fn duration_secs(&self, minutes: Option<f64>) -> Result<f64> {
        let minutes = minutes.unwrap_or(self.settings.session.default_minutes);
        if !minutes.is_finite() || minutes <= 0.0 {
            bail!("session duration must be a positive number of minutes, got {minutes}");
        }
        Ok(minutes * 60.0)
    }

    fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.session.analysis_timeout_ms)
    }

    /// Create a session and spawn its frame loop.
    pub async fn start_session(&self, minutes: Option<f64>) -> Result<SessionHandle> {
        let duration = self.duration_secs(minutes)?;
        let id = Uuid::new_v4();
        let context = Arc::new(Mutex::new(SessionContext::new(
            id,
            duration,
            &self.settings,
            self.analyzer.is_mock(),
        )));

        let clock = Instant::now();
        let mut worker = SessionWorker::new();
        let channels = worker
            .start(
                Arc::clone(&context),
                self.analyzer.clone(),
                clock,
                self.analysis_timeout(),
            )
            .context("failed to start session loop")?;

        self.sessions.lock().await.insert(
            id,
            SessionEntry {
                context,
                worker,
                clock,
            },
        );
        info!(
            "Started session {id} for {:.0}s (mock models: {})",
            duration,
            self.analyzer.is_mock()
        );

        Ok(SessionHandle {
            id,
            frames: channels.frames,
            outcomes: channels.outcomes,
        })
    }

    /// Cancel the frame loop and flush the open interval. Calling it on an
    /// already finished session returns the same summary.
    pub async fn stop_session(&self, id: Uuid) -> Result<SessionSummary> {
        let (mut worker, context, now) = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
            (
                std::mem::take(&mut entry.worker),
                Arc::clone(&entry.context),
                entry.now(),
            )
        };

        if let Some(report) = worker.stop().await? {
            info!("Stopped session {id} ({:?})", report.exit);
            return Ok(report.summary);
        }
        let summary = context.lock().await.finalize(now);
        Ok(summary)
    }

    /// Replace every entity of a running session in one step. The loop keeps
    /// running; the new context's clock starts at the last accepted frame.
    pub async fn reset_session(&self, id: Uuid, minutes: Option<f64>) -> Result<()> {
        let sessions = self.sessions.lock().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        if !entry.worker.is_running() {
            bail!("session {id} is no longer running");
        }

        let mut context = entry.context.lock().await;
        let duration = match minutes {
            Some(_) => self.duration_secs(minutes)?,
            None => context.duration(),
        };
        let origin = context.transport_position();
        *context = SessionContext::with_origin(
            id,
            duration,
            origin,
            &self.settings,
            self.analyzer.is_mock(),
        );
        info!("Reset session {id} ({:.0}s)", duration);
        Ok(())
    }

    async fn entry_context(&self, id: Uuid) -> Result<(Arc<Mutex<SessionContext>>, f64)> {
        let sessions = self.sessions.lock().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        Ok((Arc::clone(&entry.context), entry.now()))
    }

    pub async fn score_series(&self, id: Uuid) -> Result<Vec<u8>> {
        let (context, _) = self.entry_context(id).await?;
        let scores = context.lock().await.scores().to_vec();
        Ok(scores)
    }

    pub async fn events(&self, id: Uuid) -> Result<Vec<DistractionEvent>> {
        let (context, _) = self.entry_context(id).await?;
        let events = context.lock().await.events().to_vec();
        Ok(events)
    }

    pub async fn session_duration(&self, id: Uuid) -> Result<f64> {
        let (context, _) = self.entry_context(id).await?;
        let duration = context.lock().await.duration();
        Ok(duration)
    }

    pub async fn time_metrics(&self, id: Uuid) -> Result<SessionMetrics> {
        let (context, now) = self.entry_context(id).await?;
        let metrics = context.lock().await.time_metrics(now);
        Ok(metrics)
    }

    /// Smoothed score series over the elapsed time, or the placeholder
    /// series when the live one cannot be charted.
    pub async fn focus_trend(&self, id: Uuid) -> Result<FocusTrend> {
        let (context, now) = self.entry_context(id).await?;
        let (scores, elapsed) = {
            let context = context.lock().await;
            (context.scores().to_vec(), context.elapsed(now))
        };
        Ok(self
            .charts
            .focus_trend(&scores, elapsed, &mut rand::thread_rng()))
    }

    pub async fn event_timeline(&self, id: Uuid) -> Result<EventTimeline> {
        let (context, now) = self.entry_context(id).await?;
        let context = context.lock().await;
        let (times, kinds) = context.metrics_store().event_columns();
        Ok(self
            .charts
            .event_timeline(&times, &kinds, context.elapsed(now)))
    }

    pub async fn focus_split(&self, id: Uuid) -> Result<FocusSplit> {
        let (context, _) = self.entry_context(id).await?;
        let split = self.charts.focus_split(context.lock().await.scores());
        Ok(split)
    }

    pub async fn record_feedback(&self, id: Uuid, index: usize, accurate: bool) -> Result<()> {
        let (context, _) = self.entry_context(id).await?;
        let result = context.lock().await.record_feedback(index, accurate);
        result.with_context(|| format!("feedback rejected for session {id}"))
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let contexts: Vec<_> = self
            .sessions
            .lock()
            .await
            .values()
            .map(|entry| Arc::clone(&entry.context))
            .collect();

        let mut infos = Vec::with_capacity(contexts.len());
        for context in contexts {
            infos.push(context.lock().await.info());
        }
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        infos
    }

    /// Stop (if needed) and forget a session.
    pub async fn remove_session(&self, id: Uuid) -> Result<SessionSummary> {
        let summary = self.stop_session(id).await?;
        self.sessions.lock().await.remove(&id);
        info!("Removed session {id}");
        Ok(summary)
    }
}
