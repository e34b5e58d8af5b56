use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use progress_core::Clock;
use progress_core::model::{ChapterMarker, LessonId, ProgressUpdate, chapter_at};
use storage::ProgressStore;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::TrackerError;
use crate::write_policy::WritePolicy;

/// Interval between periodic progress saves.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Invoked with the lesson id the first time a session reaches completion.
pub type CompletionCallback = Arc<dyn Fn(LessonId) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub save_interval: Duration,
    pub write_policy: WritePolicy,
    pub clock: Clock,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            save_interval: DEFAULT_SAVE_INTERVAL,
            write_policy: WritePolicy::default(),
            clock: Clock::default(),
        }
    }
}

/// Point-in-time view of a live session, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub lesson_id: LessonId,
    pub started_at: DateTime<Utc>,
    pub current_time: f64,
    pub duration: f64,
    pub completion_percentage: f64,
    pub completed: bool,
    pub chapters: Vec<ChapterMarker>,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Written by `on_time_update`, read by the save loop.
#[derive(Debug, Default)]
struct SessionState {
    current_time: f64,
    duration: f64,
    position_reported: bool,
    completion_percentage: f64,
    completed: bool,
    completion_notified: bool,
    saved: bool,
    chapters: Vec<ChapterMarker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveReason {
    Periodic,
    Final,
}

impl SaveReason {
    fn operation(self) -> &'static str {
        match self {
            SaveReason::Periodic => "progress.periodic_save",
            SaveReason::Final => "progress.final_flush",
        }
    }
}

/// Everything a save needs, cloned into the timer and flush tasks.
#[derive(Clone)]
struct SaveContext {
    lesson_id: LessonId,
    store: Arc<dyn ProgressStore>,
    policy: WritePolicy,
    state: Arc<Mutex<SessionState>>,
    on_complete: Option<CompletionCallback>,
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SaveContext {
    async fn save(&self, reason: SaveReason) {
        let (update, newly_completed) = {
            let mut state = lock(&self.state);
            if reason == SaveReason::Periodic && state.duration <= 0.0 {
                tracing::debug!(lesson_id = %self.lesson_id, "duration unknown; skipping save");
                return;
            }
            let update = ProgressUpdate::from_position(state.current_time, state.duration);
            state.completion_percentage = update.completion_percentage;
            state.completed = state.completed || update.completed;
            state.saved = true;
            let newly_completed = update.completed && !state.completion_notified;
            if newly_completed {
                state.completion_notified = true;
            }
            (update, newly_completed)
        };

        if newly_completed {
            tracing::info!(lesson_id = %self.lesson_id, "lesson completed");
            if let Some(callback) = self.on_complete.as_ref() {
                callback(self.lesson_id);
            }
        }

        let store = Arc::clone(&self.store);
        let lesson_id = self.lesson_id;
        let saved = self
            .policy
            .execute(reason.operation(), || store.upsert_progress(lesson_id, &update))
            .await;
        match saved {
            Ok(Some(record)) => tracing::debug!(
                lesson_id = %lesson_id,
                percentage = record.completion_percentage,
                "progress saved"
            ),
            Ok(None) => {}
            Err(err) => tracing::warn!(lesson_id = %lesson_id, error = %err, "progress save failed"),
        }
    }

    /// Load the stored record and chapters without holding up playback.
    async fn seed(&self) {
        let (progress, chapters) = tokio::join!(
            self.store.get_progress(self.lesson_id),
            self.store.get_chapters(self.lesson_id)
        );

        let mut state = lock(&self.state);
        match progress {
            Ok(Some(record)) => {
                // A save already computed fresher values than the stored record.
                if !state.saved {
                    state.completion_percentage = record.normalized_percentage();
                    state.completed = record.completed;
                }
                if !state.position_reported {
                    state.current_time = record.current_time;
                }
                if state.duration <= 0.0 {
                    state.duration = record.duration;
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(lesson_id = %self.lesson_id, error = %err, "could not load progress");
            }
        }
        match chapters {
            Ok(chapters) => state.chapters = chapters,
            Err(err) => {
                tracing::warn!(lesson_id = %self.lesson_id, error = %err, "could not load chapters");
            }
        }
    }
}

struct PlaybackSession {
    lesson_id: LessonId,
    started_at: DateTime<Utc>,
    context: SaveContext,
    timer: JoinHandle<()>,
    seed: JoinHandle<()>,
    runtime: Handle,
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Keeps one player's watch position synced to the progress store.
///
/// A tracker owns at most one live session. `start` replaces the current
/// session (stopping it first), `stop` ends it with a final flush, and dropping
/// the tracker stops it.
pub struct PlaybackTracker {
    store: Arc<dyn ProgressStore>,
    config: TrackerConfig,
    on_complete: Option<CompletionCallback>,
    session: Option<PlaybackSession>,
}

impl PlaybackTracker {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            on_complete: None,
            session: None,
        }
    }

    #[must_use]
    pub fn with_on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    /// Begin tracking `lesson_id`.
    ///
    /// Returns immediately: the stored progress and chapter markers load in the
    /// background, and a failed load leaves completion at 0. Any session that is
    /// still live is stopped (timer cleared, final flush issued) before the new
    /// timer is created.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NoRuntime` when called outside a Tokio runtime.
    pub fn start(
        &mut self,
        lesson_id: LessonId,
        initial_position: Option<f64>,
    ) -> Result<(), TrackerError> {
        let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        // Clear the old timer before the new one exists.
        let _ = self.stop();

        let mut state = SessionState::default();
        if let Some(position) = initial_position.filter(|p| p.is_finite() && *p >= 0.0) {
            state.current_time = position;
            state.position_reported = true;
        }

        let context = SaveContext {
            lesson_id,
            store: Arc::clone(&self.store),
            policy: self.config.write_policy,
            state: Arc::new(Mutex::new(state)),
            on_complete: self.on_complete.clone(),
        };

        let seed = runtime.spawn({
            let context = context.clone();
            async move { context.seed().await }
        });
        let timer = runtime.spawn(save_loop(context.clone(), self.config.save_interval));

        tracing::info!(%lesson_id, ?initial_position, "playback session started");
        self.session = Some(PlaybackSession {
            lesson_id,
            started_at: self.config.clock.now(),
            context,
            timer,
            seed,
            runtime,
        });
        Ok(())
    }

    /// Record the player's position. No I/O happens here.
    ///
    /// Non-finite or negative values are ignored; calls without a live session
    /// are dropped.
    pub fn on_time_update(&self, current_time: f64, duration: f64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let mut state = lock(&session.context.state);
        if current_time.is_finite() && current_time >= 0.0 {
            state.current_time = current_time;
            state.position_reported = true;
        }
        if duration.is_finite() && duration >= 0.0 {
            state.duration = duration;
        }
    }

    /// End the session: clear the timer, then issue exactly one final save.
    ///
    /// The final save uses the last known position regardless of when the
    /// previous periodic save ran, and never overlaps it. The returned handle
    /// may be dropped; the flush still runs and logs rather than fails.
    /// Stopping an idle tracker is a no-op and returns `None`.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        let session = self.session.take()?;
        session.seed.abort();
        session.timer.abort();

        let lesson_id = session.lesson_id;
        let context = session.context;
        let timer = session.timer;
        tracing::info!(%lesson_id, "playback session stopping");
        Some(session.runtime.spawn(async move {
            // Let an in-flight periodic save unwind before the terminal write.
            let _ = timer.await;
            context.save(SaveReason::Final).await;
        }))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<LessonId> {
        self.session.as_ref().map(|s| s.lesson_id)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<PlaybackSnapshot> {
        let session = self.session.as_ref()?;
        let state = lock(&session.context.state);
        Some(PlaybackSnapshot {
            lesson_id: session.lesson_id,
            started_at: session.started_at,
            current_time: state.current_time,
            duration: state.duration,
            completion_percentage: state.completion_percentage,
            completed: state.completed,
            chapters: state.chapters.clone(),
        })
    }

    /// The chapter containing the current position, once chapters have loaded.
    #[must_use]
    pub fn current_chapter(&self) -> Option<ChapterMarker> {
        let session = self.session.as_ref()?;
        let state = lock(&session.context.state);
        chapter_at(&state.chapters, state.current_time).cloned()
    }
}

impl Drop for PlaybackTracker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

async fn save_loop(context: SaveContext, period: Duration) {
    // First save one full period after start, not immediately.
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        context.save(SaveReason::Periodic).await;
    }
}
