//! Feeds a stream of JSON pose frames through a session, one tick per line.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::{error::EngineError, pose::Pose, progress::ProgressStore, reps::SessionController};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// One line of input: the estimator output for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Capture time; frames without one are stamped on arrival.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub keypoints: Pose,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveSummary {
    pub frames: u64,
    pub skipped: u64,
    pub reps: u32,
    pub unsaved_reps: u32,
}

pub async fn drive_session<S, R, W>(
    controller: &SessionController<S>,
    input: R,
    mut output: W,
    cancel_token: CancellationToken,
) -> Result<DriveSummary>
where
    S: ProgressStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut summary = DriveSummary::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read pose input")?,
            _ = cancel_token.cancelled() => {
                log_info!("pose input cancelled");
                break;
            }
        };

        let Some(line) = line else {
            log_info!("pose input exhausted");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let frame: PoseFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(err) => {
                summary.skipped += 1;
                log_warn!("skipping malformed pose frame: {err}");
                continue;
            }
        };

        let now = frame.timestamp.unwrap_or_else(Utc::now);
        let report = match controller.tick(&frame.keypoints, now).await {
            Ok(report) => report,
            Err(EngineError::Persistence { report, source }) => {
                summary.unsaved_reps += 1;
                log_error!("rep {} not saved: {source}", report.rep_count);
                *report
            }
            Err(err) => return Err(err.into()),
        };

        summary.frames += 1;
        summary.reps = report.rep_count;
        log_debug!(
            "frame at {}: accuracy {} phase {:?} reps {}",
            report.at,
            report.score.accuracy,
            report.phase,
            report.rep_count
        );

        let mut encoded = serde_json::to_vec(&report)?;
        encoded.push(b'\n');
        output
            .write_all(&encoded)
            .await
            .context("failed to write tick report")?;
        output.flush().await?;
    }

    Ok(summary)
}
