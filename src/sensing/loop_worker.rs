use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::{Frame, FrameOutcome, SessionSummary};
use crate::session::{SessionContext, SessionError};

use super::FrameAnalyzer;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

/// Why a session loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopExit {
    /// A frame arrived past the configured duration.
    Ended,
    /// Explicit stop.
    Cancelled,
    /// The client dropped its frame sender or outcome receiver.
    Disconnected,
    /// The consecutive error budget ran out.
    Aborted(SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub exit: LoopExit,
    pub summary: SessionSummary,
}

/// Drives one session: frames are handled strictly in arrival order, the
/// models run off the async threads, and every exit path closes the open
/// interval before returning.
pub async fn session_loop(
    context: Arc<Mutex<SessionContext>>,
    analyzer: FrameAnalyzer,
    mut frames: mpsc::Receiver<Frame>,
    outcomes: mpsc::Sender<FrameOutcome>,
    clock: Instant,
    cancel_token: CancellationToken,
    analysis_timeout: Duration,
) -> LoopReport {
    let session_id = context.lock().await.id();
    log_info!("session loop started for {}", session_id);

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break LoopExit::Cancelled,
            next = frames.recv() => {
                let Some(frame) = next else {
                    break LoopExit::Disconnected;
                };

                let outcome = match handle_frame(&context, &analyzer, frame, analysis_timeout).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        log_error!("session {} aborted: {err}", session_id);
                        break LoopExit::Aborted(err);
                    }
                };

                let terminal = outcome.is_terminal();
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break LoopExit::Cancelled,
                    sent = outcomes.send(outcome) => {
                        if sent.is_err() {
                            break LoopExit::Disconnected;
                        }
                    }
                }
                if terminal {
                    break LoopExit::Ended;
                }
            }
        }
    };

    let summary = context
        .lock()
        .await
        .finalize(clock.elapsed().as_secs_f64());
    log_info!(
        "session loop for {} exited ({:?}) after {:.2}s",
        session_id,
        exit,
        summary.total_time
    );
    LoopReport { exit, summary }
}

async fn handle_frame(
    context: &Arc<Mutex<SessionContext>>,
    analyzer: &FrameAnalyzer,
    frame: Frame,
    analysis_timeout: Duration,
) -> Result<FrameOutcome, SessionError> {
    if let Some(outcome) = context.lock().await.admit(&frame)?.into_outcome() {
        return Ok(outcome);
    }

    let frame = Arc::new(frame);
    let analysis = tokio::time::timeout(
        analysis_timeout,
        tokio::task::spawn_blocking({
            let analyzer = analyzer.clone();
            let frame = Arc::clone(&frame);
            move || analyzer.analyze(&frame)
        }),
    )
    .await;

    let analysis = match analysis {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(anyhow!("analysis worker join failed: {join_err}")),
        Err(_) => {
            log_warn!(
                "frame analysis timeout (> {}ms) at {:.2}s",
                analysis_timeout.as_millis(),
                frame.timestamp
            );
            Err(anyhow!(
                "analysis timed out after {}ms",
                analysis_timeout.as_millis()
            ))
        }
    };

    context.lock().await.ingest(&frame, analysis)
}
