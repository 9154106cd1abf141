pub mod charts;
pub mod metrics;
pub mod models;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod signals;
pub mod tracking;
pub mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info};
use serde::Serialize;

pub use models::{DistractionEvent, DistractionKind, Frame, FrameOutcome, FrameRecord, SessionState};
pub use sensing::{FrameAnalyzer, LandmarkProvider, ObjectDetector};
pub use session::{SessionError, SessionHandle, SessionRegistry};
pub use settings::{EngineSettings, SettingsStore};

const DEFAULT_SETTINGS_FILE: &str = "focusguard-settings.json";
const DEMO_FRAME_WIDTH: u32 = 640;
const DEMO_FRAME_HEIGHT: u32 = 480;
const DEMO_FRAME_INTERVAL_SECS: f64 = 0.5;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn print_json<T: Serialize>(label: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).with_context(|| format!("failed to encode {label}"))?;
    println!("{label}: {json}");
    Ok(())
}

/// Streams synthetic frames through one mock session and prints what a
/// reporting layer would receive.
async fn demo_session(settings: EngineSettings, minutes: f64, seed: Option<u64>) -> Result<()> {
    let registry = SessionRegistry::new(settings, FrameAnalyzer::mock(seed));
    let mut handle = registry.start_session(Some(minutes)).await?;
    let id = handle.id;

    let producer = {
        let frames = handle.frames.clone();
        let last = minutes * 60.0 + DEMO_FRAME_INTERVAL_SECS;
        tokio::spawn(async move {
            let mut ts = 0.0;
            while ts <= last {
                let frame = Frame::blank(DEMO_FRAME_WIDTH, DEMO_FRAME_HEIGHT, ts);
                if frames.send(frame).await.is_err() {
                    break;
                }
                ts += DEMO_FRAME_INTERVAL_SECS;
            }
        })
    };
    drop(handle.frames);

    while let Some(outcome) = handle.outcomes.recv().await {
        print_json("frame", &outcome)?;
        if outcome.is_terminal() {
            break;
        }
    }
    producer.abort();

    print_json("metrics", &registry.time_metrics(id).await?)?;
    print_json("focus_trend", &registry.focus_trend(id).await?)?;
    print_json("event_timeline", &registry.event_timeline(id).await?)?;
    print_json("focus_split", &registry.focus_split(id).await?)?;

    let summary = registry.remove_session(id).await?;
    info!(
        "Demo session {id} finished: {:.1}s total, {:.1}s focused",
        summary.total_time, summary.focus_time
    );
    Ok(())
}

pub fn run() {
    let level = if env_flag("FOCUSGUARD_DEBUG") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // RUST_LOG, when set, takes precedence over the default level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    info!("FocusGuard starting up...");

    let result = (|| -> Result<()> {
        let settings_path = std::env::var_os("FOCUSGUARD_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        let store = SettingsStore::new(settings_path)?;

        let minutes = match std::env::var("FOCUSGUARD_DEMO_MINUTES") {
            Ok(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("invalid FOCUSGUARD_DEMO_MINUTES: {raw}"))?,
            Err(_) => 1.0,
        };
        let seed = std::env::var("FOCUSGUARD_SEED")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok());

        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
        runtime.block_on(demo_session(store.engine(), minutes, seed))
    })();

    if let Err(err) = result {
        error!("FocusGuard failed: {err:?}");
        std::process::exit(1);
    }
}
