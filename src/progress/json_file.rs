use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::{fs, sync::Mutex};

use crate::error::StoreError;

use super::{ProgressMap, ProgressStore, SessionRecord};

/// Keeps the whole progress map in one pretty-printed JSON document:
/// `{"<exerciseId>": {"totalReps": n, "sessions": [{"date", "reps", "accuracy"}]}}`.
pub struct JsonFileProgressStore {
    path: PathBuf,
    data: Mutex<ProgressMap>,
}

impl JsonFileProgressStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let data = if fs::try_exists(&path).await? {
            let contents = fs::read_to_string(&path).await?;
            if contents.trim().is_empty() {
                ProgressMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            ProgressMap::new()
        };

        info!(
            "Progress file {} holds {} exercises",
            path.display(),
            data.len()
        );

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &ProgressMap) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(data)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

impl ProgressStore for JsonFileProgressStore {
    async fn append(&self, exercise_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        let mut guard = self.data.lock().await;

        let mut updated = guard.clone();
        updated
            .entry(exercise_id.to_string())
            .or_default()
            .append(record);

        if let Err(err) = self.persist(&updated).await {
            warn!(
                "Failed to write progress file {}: {err}",
                self.path.display()
            );
            return Err(err);
        }

        *guard = updated;
        Ok(())
    }

    async fn load_all(&self) -> Result<ProgressMap, StoreError> {
        Ok(self.data.lock().await.clone())
    }
}
