//! Command-line front end.
//!
//! ```bash
//! # Score frames from a file, one JSON report per line on stdout
//! formcoach run --exercise knee-extension --input frames.jsonl
//!
//! # Live: pipe an estimator into stdin, keep history in a JSON file
//! estimator | formcoach run --exercise hip-bridge --store json
//!
//! formcoach exercises
//! formcoach progress --exercise knee-extension
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::{
    db::Database,
    driver::drive_session,
    exercises::ExerciseCatalog,
    progress::{InMemoryProgressStore, JsonFileProgressStore, ProgressMap, ProgressStore},
    reps::SessionController,
    settings::{AppSettings, SettingsStore, StoreBackend},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const SQLITE_FILE: &str = "formcoach.sqlite3";
pub const PROGRESS_FILE: &str = "exerciseProgress.json";

#[derive(Parser, Debug)]
#[command(name = "formcoach")]
#[command(author, version, about = "Exercise form scoring and rep counting from pose keypoints")]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON settings file; command-line flags take precedence
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Exercise table to load instead of the built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Default)]
pub struct StorageArgs {
    /// Where completed repetitions are recorded
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreBackend>,

    /// Directory holding the progress database or file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a stream of pose frames (JSON lines) and count repetitions
    Run(RunArgs),

    /// List the exercises in the active catalog
    Exercises,

    /// Print recorded progress
    Progress {
        /// Only show this exercise
        #[arg(long)]
        exercise: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Exercise id, e.g. `knee-extension`
    #[arg(short, long)]
    pub exercise: String,

    /// Frames file; reads stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub debounce_ms: Option<u64>,

    #[arg(long)]
    pub min_confidence: Option<f64>,
}

impl Cli {
    /// Settings file first, then flags on top.
    pub fn resolve_settings(&self) -> Result<AppSettings> {
        let mut settings = match &self.settings {
            Some(path) => SettingsStore::new(path.clone())?.get(),
            None => AppSettings::default(),
        };

        if let Some(store) = self.storage.store {
            settings.store = store;
        }
        if let Some(dir) = &self.storage.data_dir {
            settings.data_dir = Some(dir.clone());
        }
        if let Some(path) = &self.catalog {
            settings.catalog_path = Some(path.clone());
        }
        if let Commands::Run(run) = &self.command {
            if let Some(ms) = run.debounce_ms {
                settings.debounce_ms = ms;
            }
            if let Some(min) = run.min_confidence {
                settings.min_confidence = min;
            }
        }

        settings.validate()?;
        Ok(settings)
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let settings = cli.resolve_settings()?;
    let catalog = Arc::new(load_catalog(&settings)?);

    match cli.command {
        Commands::Run(args) => match settings.store {
            StoreBackend::Sqlite => {
                let db = Database::new(settings.data_dir().join(SQLITE_FILE))?;
                run_session(db, catalog, &settings, &args).await
            }
            StoreBackend::Json => {
                let store =
                    JsonFileProgressStore::open(settings.data_dir().join(PROGRESS_FILE)).await?;
                run_session(store, catalog, &settings, &args).await
            }
            StoreBackend::Memory => {
                run_session(InMemoryProgressStore::new(), catalog, &settings, &args).await
            }
        },
        Commands::Exercises => {
            for exercise in catalog.iter() {
                println!("{}", serde_json::to_string(exercise)?);
            }
            Ok(())
        }
        Commands::Progress { exercise } => {
            let progress = load_progress(&settings).await?;
            print_progress(progress, exercise.as_deref())
        }
    }
}

/// Reads recorded history without creating the store when nothing was recorded yet.
async fn load_progress(settings: &AppSettings) -> Result<ProgressMap> {
    let path = match settings.store {
        StoreBackend::Sqlite => settings.data_dir().join(SQLITE_FILE),
        StoreBackend::Json => settings.data_dir().join(PROGRESS_FILE),
        StoreBackend::Memory => {
            log_warn!("the memory store keeps nothing between runs");
            return Ok(ProgressMap::new());
        }
    };

    if !tokio::fs::try_exists(&path).await? {
        log_info!("no progress recorded yet at {}", path.display());
        return Ok(ProgressMap::new());
    }

    let progress = match settings.store {
        StoreBackend::Sqlite => Database::new(path)?.load_all().await?,
        StoreBackend::Json => JsonFileProgressStore::open(path).await?.load_all().await?,
        StoreBackend::Memory => ProgressMap::new(),
    };
    Ok(progress)
}

fn load_catalog(settings: &AppSettings) -> Result<ExerciseCatalog> {
    match &settings.catalog_path {
        Some(path) => Ok(ExerciseCatalog::from_json_file(path)?),
        None => Ok(ExerciseCatalog::builtin()),
    }
}

fn print_progress(mut progress: ProgressMap, exercise: Option<&str>) -> Result<()> {
    if let Some(id) = exercise {
        progress.retain(|key, _| key == id);
    }
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}

async fn run_session<S: ProgressStore>(
    store: S,
    catalog: Arc<ExerciseCatalog>,
    settings: &AppSettings,
    args: &RunArgs,
) -> Result<()> {
    let controller = SessionController::start(
        catalog,
        Arc::new(store),
        settings,
        &args.exercise,
        Utc::now(),
    )?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open frames file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    let signal_task = tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    log_info!("interrupt received, finishing session");
                    signal_token.cancel();
                }
            }
            _ = signal_token.cancelled() => {}
        }
    });

    let outcome = drive_session(&controller, input, tokio::io::stdout(), cancel_token.clone()).await;
    cancel_token.cancel();
    let _ = signal_task.await;

    let summary = outcome?;
    log_info!(
        "session finished: {} frames, {} skipped, {} reps ({} not saved)",
        summary.frames,
        summary.skipped,
        summary.reps,
        summary.unsaved_reps
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"debounceMs": 1500, "store": "json", "minConfidence": 0.3}"#)
            .unwrap();

        let cli = Cli::try_parse_from([
            "formcoach",
            "--settings",
            path.to_str().unwrap(),
            "run",
            "--exercise",
            "knee-extension",
            "--debounce-ms",
            "600",
            "--store",
            "memory",
        ])
        .unwrap();

        let settings = cli.resolve_settings().unwrap();
        assert_eq!(settings.debounce_ms, 600);
        assert_eq!(settings.store, StoreBackend::Memory);
        assert_eq!(settings.min_confidence, 0.3);
    }

    #[test]
    fn out_of_range_confidence_flag_is_rejected() {
        for bad in ["-1", "1.0", "NaN"] {
            let flag = format!("--min-confidence={bad}");
            let cli = Cli::try_parse_from([
                "formcoach",
                "run",
                "--exercise",
                "knee-extension",
                flag.as_str(),
            ])
            .unwrap();
            assert!(cli.resolve_settings().is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn negative_confidence_in_settings_file_cannot_admit_undetected_joints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"minConfidence": -1.0}"#).unwrap();

        let cli = Cli::try_parse_from([
            "formcoach",
            "--settings",
            path.to_str().unwrap(),
            "run",
            "--exercise",
            "knee-extension",
        ])
        .unwrap();
        let settings = cli.resolve_settings().unwrap();
        assert_eq!(settings.min_confidence, 0.5);

        let engine = crate::scoring::ScoringEngine::new(settings.scoring_config());
        let pose = crate::pose::Pose::new()
            .with(crate::pose::Keypoint::new("left_hip", 100.0, 0.0, 0.0))
            .with(crate::pose::Keypoint::new("left_knee", 0.0, 0.0, 0.0))
            .with(crate::pose::Keypoint::new("left_ankle", -100.0, 0.0, 0.0));
        let score = engine
            .evaluate_by_id(&ExerciseCatalog::builtin(), "knee-extension", &pose)
            .unwrap();
        assert_eq!(score.accuracy, 10.0);
        assert!(!score.engaged);
    }

    #[tokio::test]
    async fn progress_query_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("never-written");

        for store in [StoreBackend::Sqlite, StoreBackend::Json] {
            let settings = AppSettings {
                store,
                data_dir: Some(data_dir.clone()),
                ..AppSettings::default()
            };
            assert!(load_progress(&settings).await.unwrap().is_empty());
            assert!(!data_dir.exists());
        }
    }

    #[test]
    fn run_requires_an_exercise() {
        assert!(Cli::try_parse_from(["formcoach", "run"]).is_err());
    }

    #[tokio::test]
    async fn progress_reads_back_json_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProgressStore::open(dir.path().join(PROGRESS_FILE))
            .await
            .unwrap();
        store
            .append(
                "hip-bridge",
                crate::progress::SessionRecord::single_rep(Utc::now(), 90.0),
            )
            .await
            .unwrap();

        let cli = Cli::try_parse_from([
            "formcoach",
            "progress",
            "--store",
            "json",
            "--data-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        execute(cli).await.unwrap();
    }
}
