use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::{Frame, FrameOutcome};
use crate::session::SessionContext;

use super::loop_worker::{session_loop, LoopReport};
use super::FrameAnalyzer;

const FRAME_BUFFER: usize = 8;
const OUTCOME_BUFFER: usize = 32;

/// Client ends of a running session loop.
pub struct WorkerChannels {
    pub frames: mpsc::Sender<Frame>,
    pub outcomes: mpsc::Receiver<FrameOutcome>,
}

/// Owns the task running one session's frame loop.
pub struct SessionWorker {
    handle: Option<JoinHandle<LoopReport>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for SessionWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionWorker {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(
        &mut self,
        context: Arc<Mutex<SessionContext>>,
        analyzer: FrameAnalyzer,
        clock: Instant,
        analysis_timeout: Duration,
    ) -> Result<WorkerChannels> {
        if self.handle.is_some() {
            bail!("session loop already active");
        }

        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_BUFFER);

        let handle = tokio::spawn(session_loop(
            context,
            analyzer,
            frame_rx,
            outcome_tx,
            clock,
            cancel_token.clone(),
            analysis_timeout,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(WorkerChannels {
            frames: frame_tx,
            outcomes: outcome_rx,
        })
    }

    /// Cancel the loop and wait for it to flush. `None` if it was never
    /// started or was already stopped.
    pub async fn stop(&mut self) -> Result<Option<LoopReport>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
            info!("Cancel signal sent to session loop");
        }

        match self.handle.take() {
            Some(handle) => handle
                .await
                .context("session loop task failed to join")
                .map(Some),
            None => Ok(None),
        }
    }
}
