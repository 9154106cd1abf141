use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::charts::ChartConfig;
use crate::signals::ScoringConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Used when the client does not send a duration.
    pub default_minutes: f64,
    /// Consecutive bad frames tolerated before a session is aborted.
    pub max_consecutive_errors: u32,
    /// Frames smaller than this on either side are rejected.
    pub min_frame_dimension: u32,
    /// Upper bound on analysing one frame before it counts as failed.
    pub analysis_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_minutes: 30.0,
            max_consecutive_errors: 10,
            min_frame_dimension: 10,
            analysis_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub session: SessionSettings,
    pub scoring: ScoringConfig,
    pub charts: ChartConfig,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        self.charts.validate().context("invalid chart settings")
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                EngineSettings::default()
            })
        } else {
            EngineSettings::default()
        };

        if let Err(err) = data.charts.validate() {
            warn!("Ignoring chart settings at {}: {err}", path.display());
            data.charts = ChartConfig::default();
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.engine();
        assert_eq!(settings.session.max_consecutive_errors, 10);
        assert_eq!(settings.scoring.blink_frames, 3);
        assert_eq!(settings.charts.smoothing_window, 10);
    }

    #[test]
    fn updates_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.engine();
        settings.session.default_minutes = 45.0;
        settings.scoring.phone_min_confidence = 0.7;
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.engine(), settings);
        reopened.reload().unwrap();
        assert_eq!(reopened.engine().session.default_minutes, 45.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "session": { "max_consecutive_errors": 3 } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().engine();
        assert_eq!(settings.session.max_consecutive_errors, 3);
        assert_eq!(settings.session.default_minutes, 30.0);
        assert_eq!(settings.scoring.phone_label, "cell phone");
    }

    #[test]
    fn unusable_chart_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "session": { "max_consecutive_errors": 4 },
                 "charts": { "synthetic_score_range": [100, 60], "synthetic_samples": 0 } }"#,
        )
        .unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.engine();
        assert_eq!(settings.charts, ChartConfig::default());
        assert_eq!(settings.session.max_consecutive_errors, 4);

        let mut bad = settings.clone();
        bad.charts.synthetic_score_range = (90, 10);
        assert!(store.update(bad).is_err());
        assert_eq!(store.engine(), settings);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let settings = SettingsStore::new(path).unwrap().engine();
        assert_eq!(settings, EngineSettings::default());
    }
}
