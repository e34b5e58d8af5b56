use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use progress_core::model::{PreferenceRecord, PreferenceUpdate, VideoQuality};
use storage::ProgressStore;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::PreferencesError;
use crate::write_policy::WritePolicy;

#[derive(Debug, Default)]
struct LocalPreferences {
    record: PreferenceRecord,
    /// Fields set locally while a load was in flight; they win over the read.
    edits: PreferenceUpdate,
    loads_in_flight: usize,
    /// Resolves once the most recently queued write has finished.
    last_write: Option<oneshot::Receiver<()>>,
}

/// Playback preferences with optimistic local updates.
///
/// Setters change the in-memory record before persisting, so the player sees
/// the new value immediately. A failed write keeps the local value, and a
/// load that resolves after a setter ran never undoes that setter. Writes
/// reach the store one at a time, in the order the setters were called.
#[derive(Clone)]
pub struct PreferenceController {
    store: Arc<dyn ProgressStore>,
    policy: WritePolicy,
    local: Arc<Mutex<LocalPreferences>>,
}

impl PreferenceController {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            policy: WritePolicy::default(),
            local: Arc::new(Mutex::new(LocalPreferences::default())),
        }
    }

    #[must_use]
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock(&self) -> MutexGuard<'_, LocalPreferences> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load stored preferences, falling back to defaults if the read fails.
    ///
    /// Fields changed through a setter while the read was in flight keep
    /// their local value.
    pub async fn load(&self) -> PreferenceRecord {
        {
            let mut local = self.lock();
            if local.loads_in_flight == 0 {
                local.edits = PreferenceUpdate::default();
            }
            local.loads_in_flight += 1;
        }

        let mut loaded = match self.store.get_preferences().await {
            Ok(preferences) => preferences.sanitized(),
            Err(err) => {
                tracing::warn!(error = %err, "could not load preferences; using defaults");
                PreferenceRecord::default()
            }
        };

        let mut local = self.lock();
        local.loads_in_flight = local.loads_in_flight.saturating_sub(1);
        if !local.edits.is_empty() {
            tracing::debug!("keeping preferences changed during load");
            loaded.apply(&local.edits);
        }
        if local.loads_in_flight == 0 {
            local.edits = PreferenceUpdate::default();
        }
        local.record = loaded.clone();
        loaded
    }

    /// The preferences the player should use right now.
    #[must_use]
    pub fn current(&self) -> PreferenceRecord {
        self.lock().record.clone()
    }

    /// Change playback speed.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesError::Invalid` for an out-of-range value and
    /// `PreferencesError::NoRuntime` outside a Tokio runtime. Nothing changes
    /// in either case.
    pub fn set_speed(&self, speed: f64) -> Result<JoinHandle<()>, PreferencesError> {
        self.apply(PreferenceUpdate::speed(speed)?)
    }

    /// # Errors
    ///
    /// Returns `PreferencesError::NoRuntime` outside a Tokio runtime.
    pub fn set_quality(&self, quality: VideoQuality) -> Result<JoinHandle<()>, PreferencesError> {
        self.apply(PreferenceUpdate::quality(quality))
    }

    /// # Errors
    ///
    /// Returns `PreferencesError::NoRuntime` outside a Tokio runtime.
    pub fn set_auto_play_next(&self, enabled: bool) -> Result<JoinHandle<()>, PreferencesError> {
        self.apply(PreferenceUpdate::auto_play_next(enabled))
    }

    /// # Errors
    ///
    /// Returns `PreferencesError::Invalid` for a blank language and
    /// `PreferencesError::NoRuntime` outside a Tokio runtime.
    pub fn set_captions(
        &self,
        show: bool,
        language: &str,
    ) -> Result<JoinHandle<()>, PreferencesError> {
        self.apply(PreferenceUpdate::captions(show, language)?)
    }

    fn apply(&self, update: PreferenceUpdate) -> Result<JoinHandle<()>, PreferencesError> {
        let runtime = Handle::try_current().map_err(|_| PreferencesError::NoRuntime)?;
        let (done, finished) = oneshot::channel::<()>();
        let previous = {
            let mut local = self.lock();
            local.record.apply(&update);
            if local.loads_in_flight > 0 {
                local.edits.merge(&update);
            }
            local.last_write.replace(finished)
        };

        let store = Arc::clone(&self.store);
        let policy = self.policy;
        Ok(runtime.spawn(async move {
            if let Some(previous) = previous {
                // Resolves with an error once the earlier task drops its sender.
                let _ = previous.await;
            }
            let saved = policy
                .execute("preferences.save", || store.upsert_preferences(&update))
                .await;
            if let Err(err) = saved {
                tracing::warn!(error = %err, "preference save failed");
            }
            drop(done);
        }))
    }
}
