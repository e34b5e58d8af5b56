#![forbid(unsafe_code)]

pub mod aggregate;
pub mod app_services;
pub mod dashboard;
pub mod error;
pub mod playback;
pub mod preferences;
pub mod write_policy;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use dashboard::{DashboardService, DashboardSnapshot, SortKey, StatusFilter};
pub use error::{AppServicesError, DashboardError, PreferencesError, TrackerError};
pub use playback::{PlaybackSnapshot, PlaybackTracker, TrackerConfig};
pub use preferences::PreferenceController;
pub use write_policy::{FailureAction, WritePolicy};
