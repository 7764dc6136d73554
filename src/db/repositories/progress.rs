use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        helpers::{parse_datetime, to_u32, to_u64},
        Database,
    },
    error::StoreError,
    progress::{ExerciseProgress, ProgressMap, ProgressStore, SessionRecord},
};

fn row_to_record(row: &Row) -> Result<SessionRecord> {
    let date: String = row.get("date")?;
    let reps: i64 = row.get("reps")?;

    Ok(SessionRecord {
        date: parse_datetime(&date, "date")?,
        reps: to_u32(reps, "reps")?,
        accuracy: row.get("accuracy")?,
    })
}

impl Database {
    /// Inserts the record and bumps the exercise total in one transaction.
    pub async fn append_session_record(
        &self,
        exercise_id: &str,
        record: &SessionRecord,
    ) -> Result<()> {
        let exercise_id = exercise_id.to_string();
        let record = record.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let stamp = record.date.to_rfc3339();

            tx.execute(
                "INSERT INTO exercise_progress (exercise_id, total_reps, created_at, updated_at)
                 VALUES (?1, 1, ?2, ?2)
                 ON CONFLICT(exercise_id) DO UPDATE
                 SET total_reps = total_reps + 1,
                     updated_at = excluded.updated_at",
                params![exercise_id, stamp],
            )
            .with_context(|| "failed to update exercise total")?;

            tx.execute(
                "INSERT INTO session_records (exercise_id, date, reps, accuracy)
                 VALUES (?1, ?2, ?3, ?4)",
                params![exercise_id, stamp, record.reps, record.accuracy],
            )
            .with_context(|| "failed to insert session record")?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_exercise_progress(&self, exercise_id: &str) -> Result<Option<ExerciseProgress>> {
        let exercise_id = exercise_id.to_string();
        self.execute(move |conn| {
            let total_reps: Option<i64> = conn
                .query_row(
                    "SELECT total_reps FROM exercise_progress WHERE exercise_id = ?1",
                    params![exercise_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(total_reps) = total_reps else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT date, reps, accuracy
                 FROM session_records
                 WHERE exercise_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![exercise_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_record(row)?);
            }

            Ok(Some(ExerciseProgress {
                total_reps: to_u64(total_reps, "total_reps")?,
                sessions,
            }))
        })
        .await
    }

    pub async fn list_progress(&self) -> Result<ProgressMap> {
        self.execute(|conn| {
            let mut progress = ProgressMap::new();

            let mut totals = conn.prepare(
                "SELECT exercise_id, total_reps FROM exercise_progress ORDER BY exercise_id",
            )?;
            let mut rows = totals.query([])?;
            while let Some(row) = rows.next()? {
                let exercise_id: String = row.get("exercise_id")?;
                let total_reps: i64 = row.get("total_reps")?;
                progress.insert(
                    exercise_id,
                    ExerciseProgress {
                        total_reps: to_u64(total_reps, "total_reps")?,
                        sessions: Vec::new(),
                    },
                );
            }

            let mut records = conn.prepare(
                "SELECT exercise_id, date, reps, accuracy
                 FROM session_records
                 ORDER BY exercise_id, id ASC",
            )?;
            let mut rows = records.query([])?;
            while let Some(row) = rows.next()? {
                let exercise_id: String = row.get("exercise_id")?;
                let record = row_to_record(row)?;
                progress.entry(exercise_id).or_default().sessions.push(record);
            }

            Ok(progress)
        })
        .await
    }
}

impl ProgressStore for Database {
    async fn append(&self, exercise_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        Ok(self.append_session_record(exercise_id, &record).await?)
    }

    async fn load_all(&self) -> Result<ProgressMap, StoreError> {
        Ok(self.list_progress().await?)
    }
}
