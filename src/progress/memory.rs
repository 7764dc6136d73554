use std::sync::{Arc, Mutex};

use crate::error::StoreError;

use super::{ProgressMap, ProgressStore, SessionRecord};

/// Process-local store for tests and throwaway sessions. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProgressStore {
    data: Arc<Mutex<ProgressMap>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ProgressMap>, StoreError> {
        self.data
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory progress lock poisoned".into()))
    }
}

impl ProgressStore for InMemoryProgressStore {
    async fn append(&self, exercise_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        self.lock()?
            .entry(exercise_id.to_string())
            .or_default()
            .append(record);
        Ok(())
    }

    async fn load_all(&self) -> Result<ProgressMap, StoreError> {
        Ok(self.lock()?.clone())
    }
}
