//! Scores exercise form from 2D pose keypoints and counts repetitions.
//!
//! A pose estimator produces named keypoints per frame. [`ScoringEngine`] turns one
//! frame into an accuracy score and feedback for the selected exercise,
//! [`SessionController`] feeds those scores through a debounced engaged/disengaged
//! state machine, and every completed repetition is appended to a [`ProgressStore`].

#[macro_use]
mod utils;

pub mod cli;
pub mod db;
pub mod driver;
pub mod error;
pub mod exercises;
pub mod pose;
pub mod progress;
pub mod reps;
pub mod scoring;
pub mod settings;

use clap::Parser;

pub use db::Database;
pub use error::{EngineError, StoreError};
pub use exercises::{ExerciseCatalog, ExerciseDefinition, Side};
pub use pose::{angle_at, Keypoint, Point, Pose};
pub use progress::{
    ExerciseProgress, InMemoryProgressStore, JsonFileProgressStore, ProgressMap, ProgressStore,
    SessionRecord,
};
pub use reps::{RepPhase, RepState, SessionController, SessionEvent, TickReport};
pub use scoring::{ScoreResult, ScoringConfig, ScoringEngine};
pub use settings::{AppSettings, SettingsStore, StoreBackend};

/// Debug output for this crate only; `RUST_LOG` still wins when set.
const DEBUG_ENV: &str = "FORMCOACH_DEBUG";

pub fn run() -> anyhow::Result<()> {
    let crate_level = if std::env::var_os(DEBUG_ENV).is_some() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("formcoach_lib", crate_level)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();

    log::info!("formcoach {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::execute(cli))
}
