use std::sync::Arc;

use storage::{CourseListing, HttpProgressStore, InMemoryProgressStore, ProgressStore, StoreConfig};

use crate::dashboard::DashboardService;
use crate::error::AppServicesError;
use crate::playback::{PlaybackTracker, TrackerConfig};
use crate::preferences::PreferenceController;

/// Assembles app-facing services around one shared store client.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn ProgressStore>,
    tracker_config: TrackerConfig,
    preferences: PreferenceController,
    dashboard: DashboardService,
}

impl AppServices {
    /// Build services backed by the HTTP progress store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be created.
    pub fn new_http(
        config: StoreConfig,
        tracker_config: TrackerConfig,
    ) -> Result<Self, AppServicesError> {
        let store = Arc::new(HttpProgressStore::new(config)?);
        Ok(Self::from_parts(store.clone(), store, tracker_config))
    }

    /// Build services backed by an in-process store.
    #[must_use]
    pub fn new_in_memory(store: InMemoryProgressStore, tracker_config: TrackerConfig) -> Self {
        let store = Arc::new(store);
        Self::from_parts(store.clone(), store, tracker_config)
    }

    #[must_use]
    pub fn from_parts(
        store: Arc<dyn ProgressStore>,
        listing: Arc<dyn CourseListing>,
        tracker_config: TrackerConfig,
    ) -> Self {
        let preferences = PreferenceController::new(Arc::clone(&store))
            .with_write_policy(tracker_config.write_policy);
        let dashboard = DashboardService::new(tracker_config.clock, listing);
        Self {
            store,
            tracker_config,
            preferences,
            dashboard,
        }
    }

    /// A fresh tracker for one mounted player.
    #[must_use]
    pub fn tracker(&self) -> PlaybackTracker {
        PlaybackTracker::new(Arc::clone(&self.store), self.tracker_config)
    }

    #[must_use]
    pub fn preferences(&self) -> &PreferenceController {
        &self.preferences
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.dashboard
    }
}
