use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, UserId};

/// Completion percentage at which a lesson counts as watched.
pub const COMPLETION_THRESHOLD: f64 = 90.0;

//
// ─── COMPLETION MATH ───────────────────────────────────────────────────────────
//

/// Percentage of a lesson watched, clamped to `[0, 100]`.
///
/// Returns `0.0` when `duration` is zero, negative, or either input is not finite.
///
/// ```
/// # use progress_core::model::completion_percentage;
/// assert_eq!(completion_percentage(30.0, 120.0), 25.0);
/// assert_eq!(completion_percentage(10.0, 0.0), 0.0);
/// assert_eq!(completion_percentage(200.0, 120.0), 100.0);
/// ```
#[must_use]
pub fn completion_percentage(current_time: f64, duration: f64) -> f64 {
    if !current_time.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    (current_time / duration * 100.0).clamp(0.0, 100.0)
}

/// Whether a completion percentage crosses the watched threshold.
#[must_use]
pub fn is_completed(percentage: f64) -> bool {
    percentage >= COMPLETION_THRESHOLD
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted watch progress for one lesson, as returned by the progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<UserId>,
    #[serde(alias = "lesson_id")]
    pub lesson_id: LessonId,
    #[serde(default, alias = "current_time")]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default, alias = "completion_percentage")]
    pub completion_percentage: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, alias = "watch_count")]
    pub watch_count: u32,
    #[serde(default, alias = "last_watched_at")]
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Completion percentage with the record's invariants applied.
    ///
    /// Backends occasionally report a percentage for zero-length lessons; those
    /// read as `0.0` here.
    #[must_use]
    pub fn normalized_percentage(&self) -> f64 {
        if self.duration <= 0.0 || !self.completion_percentage.is_finite() {
            return 0.0;
        }
        self.completion_percentage.clamp(0.0, 100.0)
    }
}

/// Write body for a progress upsert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub current_time: f64,
    pub duration: f64,
    pub completion_percentage: f64,
    pub completed: bool,
}

impl ProgressUpdate {
    /// Derive the completion fields from a playback position.
    #[must_use]
    pub fn from_position(current_time: f64, duration: f64) -> Self {
        let completion_percentage = completion_percentage(current_time, duration);
        Self {
            current_time: current_time.max(0.0),
            duration: duration.max(0.0),
            completion_percentage,
            completed: is_completed(completion_percentage),
        }
    }
}
