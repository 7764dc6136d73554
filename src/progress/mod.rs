//! Durable history of completed repetitions, keyed by exercise id.
//!
//! The engine only ever appends. The aggregate shape is read back wholesale by
//! reporting code that lives outside this crate.

pub mod json_file;
pub mod memory;

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use json_file::JsonFileProgressStore;
pub use memory::InMemoryProgressStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub date: DateTime<Utc>,
    pub reps: u32,
    pub accuracy: f64,
}

impl SessionRecord {
    /// One completed repetition.
    pub fn single_rep(date: DateTime<Utc>, accuracy: f64) -> Self {
        Self {
            date,
            reps: 1,
            accuracy,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    /// Always equals `sessions.len()`.
    pub total_reps: u64,
    pub sessions: Vec<SessionRecord>,
}

impl ExerciseProgress {
    pub fn append(&mut self, record: SessionRecord) {
        self.total_reps += 1;
        self.sessions.push(record);
    }
}

pub type ProgressMap = BTreeMap<String, ExerciseProgress>;

/// Append-only sink for completed repetitions.
///
/// Implementations own retries and idempotency; callers append once per repetition
/// and do not deduplicate.
pub trait ProgressStore: Send + Sync + 'static {
    fn append(
        &self,
        exercise_id: &str,
        record: SessionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn load_all(&self) -> impl Future<Output = Result<ProgressMap, StoreError>> + Send;
}
