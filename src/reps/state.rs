use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEBOUNCE_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RepPhase {
    #[default]
    Disengaged,
    Engaged,
}

/// Emitted when the user leaves the engaged position after holding it: one repetition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepCompletion {
    pub rep_count: u32,
    pub completed_at: DateTime<Utc>,
    pub accuracy: f64,
}

/// Up/down repetition counter with a refractory period between phase changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepState {
    pub phase: RepPhase,
    pub rep_count: u32,
    /// `None` until the first transition of a fresh session.
    pub last_transition_at: Option<DateTime<Utc>>,
    /// Best accuracy seen while engaged; recorded with the completed repetition.
    #[serde(skip)]
    pub engaged_peak_accuracy: f64,
}

impl RepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to `Disengaged` with zero reps. The debounce window restarts at `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self {
            last_transition_at: Some(now),
            ..Self::default()
        };
    }

    pub fn debounce_elapsed(&self, now: DateTime<Utc>, debounce: Duration) -> bool {
        match self.last_transition_at {
            Some(last) => now.signed_duration_since(last) > debounce,
            None => true,
        }
    }

    /// Feeds one evaluation tick. Returns the completed repetition, if this tick closed one.
    pub fn advance(
        &mut self,
        engaged: bool,
        accuracy: f64,
        now: DateTime<Utc>,
        debounce: Duration,
    ) -> Option<RepCompletion> {
        if self.phase == RepPhase::Engaged && accuracy > self.engaged_peak_accuracy {
            self.engaged_peak_accuracy = accuracy;
        }

        if !self.debounce_elapsed(now, debounce) {
            return None;
        }

        match (self.phase, engaged) {
            (RepPhase::Disengaged, true) => {
                self.phase = RepPhase::Engaged;
                self.last_transition_at = Some(now);
                self.engaged_peak_accuracy = accuracy;
                None
            }
            (RepPhase::Engaged, false) => {
                self.phase = RepPhase::Disengaged;
                self.last_transition_at = Some(now);
                self.rep_count += 1;
                let accuracy = std::mem::take(&mut self.engaged_peak_accuracy);
                Some(RepCompletion {
                    rep_count: self.rep_count,
                    completed_at: now,
                    accuracy,
                })
            }
            _ => None,
        }
    }
}
