//! Error types surfaced by the evaluation engine and the progress stores.
//!
//! Missing or low-confidence joints are not errors; they are scored as a low-confidence
//! result. Only contract violations, bad configuration and storage failures land here.

use std::path::PathBuf;

use thiserror::Error;

use crate::reps::TickReport;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The caller asked for an exercise that is not in the catalog.
    #[error("unknown exercise id '{0}'")]
    UnknownExercise(String),

    #[error("invalid exercise catalog: {0}")]
    InvalidCatalog(String),

    #[error("failed to read exercise catalog {path}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("exercise catalog is not valid JSON")]
    CatalogSyntax(#[source] serde_json::Error),

    #[error("failed to parse exercise catalog {path}")]
    CatalogFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The repetition was counted but its record could not be written.
    #[error("repetition {} was counted but not persisted", .report.rep_count)]
    Persistence {
        report: Box<TickReport>,
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    /// The tick that was still applied in memory, for errors raised after the state moved.
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            EngineError::Persistence { report, .. } => Some(report),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("progress file I/O failed")]
    Io(#[from] std::io::Error),

    #[error("progress data is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] anyhow::Error),

    #[error("progress store unavailable: {0}")]
    Unavailable(String),
}
