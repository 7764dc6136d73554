use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{reps::DEFAULT_DEBOUNCE_MS, scoring::ScoringConfig};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Minimum time between accepted phase changes.
    pub debounce_ms: u64,
    pub min_confidence: f64,
    pub store: StoreBackend,
    pub data_dir: Option<PathBuf>,
    /// Exercise table to use instead of the built-in one.
    pub catalog_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS as u64,
            min_confidence: 0.5,
            store: StoreBackend::default(),
            data_dir: None,
            catalog_path: None,
        }
    }
}

impl AppSettings {
    /// `min_confidence` must be finite and in `[0, 1)`; anything else either admits
    /// undetected joints or rejects every frame.
    pub fn validate(&self) -> Result<()> {
        let min = self.min_confidence;
        if !(min.is_finite() && (0.0..1.0).contains(&min)) {
            bail!("minConfidence must be in [0, 1), got {min}");
        }
        Ok(())
    }

    pub fn debounce(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.debounce_ms).unwrap_or(i64::MAX))
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            min_confidence: self.min_confidence,
            ..ScoringConfig::default()
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("formcoach-data"))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let parsed = serde_json::from_str::<AppSettings>(&contents)
                .map_err(anyhow::Error::from)
                .and_then(|settings| settings.validate().map(|()| settings));
            parsed.unwrap_or_else(|err| {
                warn!(
                    "Ignoring unusable settings file {}: {err}",
                    path.display()
                );
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: AppSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
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
        let settings = store.get();

        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.store, StoreBackend::Sqlite);
        assert_eq!(settings.debounce(), chrono::Duration::milliseconds(1000));
        assert_eq!(settings.scoring_config().min_confidence, 0.5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"debounceMs": 1500, "store": "json"}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().get();
        assert_eq!(settings.debounce_ms, 1500);
        assert_eq!(settings.store, StoreBackend::Json);
        assert_eq!(settings.min_confidence, 0.5);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "debounce = 3").unwrap();

        assert_eq!(SettingsStore::new(path).unwrap().get(), AppSettings::default());
    }

    #[test]
    fn out_of_range_confidence_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        for raw in [
            r#"{"minConfidence": -1.0}"#,
            r#"{"minConfidence": 1.0}"#,
            r#"{"minConfidence": 3.5, "debounceMs": 200}"#,
        ] {
            fs::write(&path, raw).unwrap();
            let settings = SettingsStore::new(path.clone()).unwrap().get();
            assert_eq!(settings, AppSettings::default(), "accepted {raw}");
        }
    }

    #[test]
    fn validate_bounds_min_confidence() {
        let with = |min_confidence| AppSettings {
            min_confidence,
            ..AppSettings::default()
        };
        assert!(with(0.0).validate().is_ok());
        assert!(with(0.99).validate().is_ok());
        assert!(with(-0.1).validate().is_err());
        assert!(with(1.0).validate().is_err());
        assert!(with(f64::NAN).validate().is_err());
    }

    #[test]
    fn update_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let bad = AppSettings {
            min_confidence: -1.0,
            ..AppSettings::default()
        };
        assert!(store.update(bad).is_err());
        assert_eq!(store.get(), AppSettings::default());
        assert!(!path.exists());
    }

    #[test]
    fn update_persists_and_reload_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.get();
        settings.min_confidence = 0.6;
        settings.store = StoreBackend::Memory;
        store.update(settings.clone()).unwrap();

        let other = SettingsStore::new(path).unwrap();
        assert_eq!(other.get(), settings);

        other
            .update(AppSettings {
                debounce_ms: 800,
                ..settings
            })
            .unwrap();
        store.reload().unwrap();
        assert_eq!(store.get().debounce_ms, 800);
    }
}
