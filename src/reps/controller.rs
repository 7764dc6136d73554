use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::{
    error::EngineError,
    exercises::{ExerciseCatalog, ExerciseDefinition},
    pose::Pose,
    progress::{ProgressStore, SessionRecord},
    scoring::{ScoreResult, ScoringEngine},
    settings::AppSettings,
};

use super::{RepPhase, RepState};

const EVENT_CAPACITY: usize = 64;

/// Everything the UI needs after one evaluation tick.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub session_id: String,
    pub exercise_id: String,
    pub at: DateTime<Utc>,
    pub score: ScoreResult,
    pub phase: RepPhase,
    pub rep_count: u32,
    /// Set on the tick that completed a repetition.
    pub completed_rep: Option<SessionRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub exercise_id: String,
    pub started_at: DateTime<Utc>,
    pub state: RepState,
    pub last_score: Option<ScoreResult>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    PhaseChanged {
        session_id: String,
        exercise_id: String,
        phase: RepPhase,
        at: DateTime<Utc>,
    },
    RepCompleted {
        session_id: String,
        exercise_id: String,
        rep_count: u32,
        record: SessionRecord,
    },
    SessionReset {
        session_id: String,
        exercise_id: String,
        at: DateTime<Utc>,
    },
}

struct ActiveSession {
    session_id: String,
    exercise: ExerciseDefinition,
    started_at: DateTime<Utc>,
    reps: RepState,
    last_score: Option<ScoreResult>,
}

impl ActiveSession {
    fn fresh(exercise: ExerciseDefinition, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            exercise,
            started_at: now,
            reps: RepState::new(),
            last_score: None,
        }
    }
}

/// Drives one exercise session: scores each pose, advances the rep counter and records
/// completed repetitions. Ticks are serialized on the session lock; clones share the
/// same session.
pub struct SessionController<S> {
    state: Arc<Mutex<ActiveSession>>,
    /// Taken under the session lock and held across the store write, so records land in
    /// `rep_count` order.
    append_order: Arc<Mutex<()>>,
    catalog: Arc<ExerciseCatalog>,
    engine: ScoringEngine,
    store: Arc<S>,
    events: broadcast::Sender<SessionEvent>,
    debounce: Duration,
}

impl<S> Clone for SessionController<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            append_order: self.append_order.clone(),
            catalog: self.catalog.clone(),
            engine: self.engine.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
            debounce: self.debounce,
        }
    }
}

impl<S: ProgressStore> SessionController<S> {
    pub fn start(
        catalog: Arc<ExerciseCatalog>,
        store: Arc<S>,
        settings: &AppSettings,
        exercise_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let exercise = catalog.get(exercise_id)?.clone();
        let session = ActiveSession::fresh(exercise, now);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            "Starting session {} for exercise {}",
            session.session_id, exercise_id
        );

        Ok(Self {
            state: Arc::new(Mutex::new(session)),
            append_order: Arc::new(Mutex::new(())),
            catalog,
            engine: ScoringEngine::new(settings.scoring_config()),
            store,
            events,
            debounce: settings.debounce(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.state.lock().await;
        SessionSnapshot {
            session_id: session.session_id.clone(),
            exercise_id: session.exercise.id.clone(),
            started_at: session.started_at,
            state: session.reps.clone(),
            last_score: session.last_score.clone(),
        }
    }

    /// Scores one pose and advances the rep counter.
    ///
    /// A completed repetition is appended to the store once, after the session lock is
    /// released. Concurrent ticks on clones still append in `rep_count` order. If the
    /// write fails the repetition still counts and the error carries the full report.
    pub async fn tick(&self, pose: &Pose, now: DateTime<Utc>) -> Result<TickReport, EngineError> {
        let (report, phase_changed, _append_guard) = {
            let mut session = self.state.lock().await;
            let score = self.engine.evaluate(pose, &session.exercise);

            let previous_phase = session.reps.phase;
            let completion =
                session
                    .reps
                    .advance(score.engaged, score.accuracy, now, self.debounce);
            session.last_score = Some(score.clone());

            let append_guard = if completion.is_some() {
                Some(self.append_order.clone().lock_owned().await)
            } else {
                None
            };

            let report = TickReport {
                session_id: session.session_id.clone(),
                exercise_id: session.exercise.id.clone(),
                at: now,
                score,
                phase: session.reps.phase,
                rep_count: session.reps.rep_count,
                completed_rep: completion
                    .map(|done| SessionRecord::single_rep(done.completed_at, done.accuracy)),
            };
            (report, previous_phase != session.reps.phase, append_guard)
        };

        if phase_changed {
            self.emit(SessionEvent::PhaseChanged {
                session_id: report.session_id.clone(),
                exercise_id: report.exercise_id.clone(),
                phase: report.phase,
                at: now,
            });
        }

        if let Some(record) = report.completed_rep.clone() {
            info!(
                "Rep {} completed for {} at {:.1}% accuracy",
                report.rep_count, report.exercise_id, record.accuracy
            );

            self.emit(SessionEvent::RepCompleted {
                session_id: report.session_id.clone(),
                exercise_id: report.exercise_id.clone(),
                rep_count: report.rep_count,
                record: record.clone(),
            });

            if let Err(source) = self.store.append(&report.exercise_id, record).await {
                error!(
                    "Failed to record rep {} for {}: {source}",
                    report.rep_count, report.exercise_id
                );
                return Err(EngineError::Persistence {
                    report: Box::new(report),
                    source,
                });
            }
        }

        Ok(report)
    }

    /// Starts over on another exercise. An unknown id leaves the current session untouched.
    pub async fn switch_exercise(
        &self,
        exercise_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let exercise = self.catalog.get(exercise_id)?.clone();
        let mut session = self.state.lock().await;
        session.exercise = exercise;
        self.reset_locked(&mut session, now);
        Ok(())
    }

    /// Starts over on the same exercise. Recorded history is left alone.
    pub async fn restart(&self, now: DateTime<Utc>) {
        let mut session = self.state.lock().await;
        self.reset_locked(&mut session, now);
    }

    fn reset_locked(&self, session: &mut ActiveSession, now: DateTime<Utc>) {
        session.session_id = Uuid::new_v4().to_string();
        session.started_at = now;
        session.reps.reset(now);
        session.last_score = None;

        info!(
            "Reset to session {} for exercise {}",
            session.session_id, session.exercise.id
        );

        self.emit(SessionEvent::SessionReset {
            session_id: session.session_id.clone(),
            exercise_id: session.exercise.id.clone(),
            at: now,
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
