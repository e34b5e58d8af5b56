use async_trait::async_trait;
use progress_core::Clock;
use progress_core::model::{
    ChapterMarker, LessonId, PreferenceRecord, PreferenceUpdate, ProgressRecord, ProgressUpdate,
    sort_chapters,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by progress store adapters.
///
/// Every store call resolves to one of these instead of panicking, so callers
/// decide whether a failure is worth surfacing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl StoreError {
    /// Failures where repeating the same request could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Timeout | StoreError::Connection(_) => true,
            StoreError::Status(code) => *code >= 500 || *code == 429,
            StoreError::Rejected(_) | StoreError::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Status(status.as_u16())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Remote progress and preference operations used by playback.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetch the stored progress for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on transport, server, or decoding failures. A lesson
    /// that was never watched is `Ok(None)`.
    async fn get_progress(&self, lesson_id: LessonId)
    -> Result<Option<ProgressRecord>, StoreError>;

    /// Create or replace the progress for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write did not reach the server or was rejected.
    async fn upsert_progress(
        &self,
        lesson_id: LessonId,
        update: &ProgressUpdate,
    ) -> Result<ProgressRecord, StoreError>;

    /// # Errors
    ///
    /// Returns `StoreError` on transport, server, or decoding failures.
    async fn get_preferences(&self) -> Result<PreferenceRecord, StoreError>;

    /// Persist the set fields of a partial preference update.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write did not reach the server or was rejected.
    async fn upsert_preferences(
        &self,
        update: &PreferenceUpdate,
    ) -> Result<PreferenceRecord, StoreError>;

    /// Fetch chapter markers for a lesson, in display order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on transport, server, or decoding failures.
    async fn get_chapters(&self, lesson_id: LessonId) -> Result<Vec<ChapterMarker>, StoreError>;
}

/// Source of the raw dashboard listing (`courses` + `recentQuizzes`).
///
/// The payload shape varies between backends, so it is returned untyped and
/// normalized by the aggregator.
#[async_trait]
pub trait CourseListing: Send + Sync {
    /// # Errors
    ///
    /// Returns `StoreError` if the listing could not be fetched.
    async fn get_dashboard_listing(&self) -> Result<Value, StoreError>;
}

//
// ─── IN-MEMORY STORE ───────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    progress: HashMap<LessonId, ProgressRecord>,
    preferences: Option<PreferenceRecord>,
    chapters: HashMap<LessonId, Vec<ChapterMarker>>,
    listing: Option<Value>,
    progress_writes: Vec<(LessonId, ProgressUpdate)>,
    preference_writes: Vec<PreferenceUpdate>,
    write_attempts: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// Simple in-memory store for tests, demos, and offline use.
///
/// Failures can be injected per direction to exercise fallback paths.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    clock: Clock,
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, InMemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn insert_progress(&self, record: ProgressRecord) {
        self.lock().progress.insert(record.lesson_id, record);
    }

    pub fn insert_preferences(&self, preferences: PreferenceRecord) {
        self.lock().preferences = Some(preferences);
    }

    pub fn insert_chapters(&self, lesson_id: LessonId, chapters: Vec<ChapterMarker>) {
        self.lock().chapters.insert(lesson_id, chapters);
    }

    pub fn set_listing(&self, listing: Value) {
        self.lock().listing = Some(listing);
    }

    /// Make every read fail with a transport error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every write fail with a server error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Successful progress writes, oldest first.
    #[must_use]
    pub fn progress_writes(&self) -> Vec<(LessonId, ProgressUpdate)> {
        self.lock().progress_writes.clone()
    }

    /// Successful preference writes, oldest first.
    #[must_use]
    pub fn preference_writes(&self) -> Vec<PreferenceUpdate> {
        self.lock().preference_writes.clone()
    }

    /// Every write attempt, including failed ones.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.lock().write_attempts
    }

    #[must_use]
    pub fn progress(&self, lesson_id: LessonId) -> Option<ProgressRecord> {
        self.lock().progress.get(&lesson_id).cloned()
    }

    fn check_read(state: &InMemoryState) -> Result<(), StoreError> {
        if state.fail_reads {
            return Err(StoreError::Transport("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(state: &mut InMemoryState) -> Result<(), StoreError> {
        state.write_attempts += 1;
        if state.fail_writes {
            return Err(StoreError::Status(503));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get_progress(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let guard = self.state()?;
        Self::check_read(&guard)?;
        Ok(guard.progress.get(&lesson_id).cloned())
    }

    async fn upsert_progress(
        &self,
        lesson_id: LessonId,
        update: &ProgressUpdate,
    ) -> Result<ProgressRecord, StoreError> {
        let now = self.clock.now();
        let mut guard = self.state()?;
        Self::check_write(&mut guard)?;
        guard.progress_writes.push((lesson_id, *update));

        let record = guard
            .progress
            .entry(lesson_id)
            .or_insert_with(|| ProgressRecord {
                user_id: None,
                lesson_id,
                current_time: 0.0,
                duration: 0.0,
                completion_percentage: 0.0,
                completed: false,
                watch_count: 0,
                last_watched_at: None,
            });
        // A lesson stays completed once any write marked it so.
        let was_completed = record.completed;
        record.current_time = update.current_time;
        record.duration = update.duration;
        record.completion_percentage = update.completion_percentage;
        record.completed = was_completed || update.completed;
        if update.completed && !was_completed {
            record.watch_count = record.watch_count.saturating_add(1);
        }
        record.last_watched_at = Some(now);
        Ok(record.clone())
    }

    async fn get_preferences(&self) -> Result<PreferenceRecord, StoreError> {
        let guard = self.state()?;
        Self::check_read(&guard)?;
        Ok(guard.preferences.clone().unwrap_or_default())
    }

    async fn upsert_preferences(
        &self,
        update: &PreferenceUpdate,
    ) -> Result<PreferenceRecord, StoreError> {
        let mut guard = self.state()?;
        Self::check_write(&mut guard)?;
        guard.preference_writes.push(update.clone());
        let mut merged = guard.preferences.clone().unwrap_or_default();
        merged.apply(update);
        guard.preferences = Some(merged.clone());
        Ok(merged)
    }

    async fn get_chapters(&self, lesson_id: LessonId) -> Result<Vec<ChapterMarker>, StoreError> {
        let guard = self.state()?;
        Self::check_read(&guard)?;
        let mut chapters = guard.chapters.get(&lesson_id).cloned().unwrap_or_default();
        sort_chapters(&mut chapters);
        Ok(chapters)
    }
}

#[async_trait]
impl CourseListing for InMemoryProgressStore {
    async fn get_dashboard_listing(&self) -> Result<Value, StoreError> {
        let guard = self.state()?;
        Self::check_read(&guard)?;
        Ok(guard
            .listing
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "courses": [], "recentQuizzes": [] })))
    }
}
