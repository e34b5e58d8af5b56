//! Shared error types for the services crate.

use thiserror::Error;

use progress_core::model::PreferenceError;
use storage::{ConfigError, StoreError};

/// Errors emitted by `PlaybackTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("playback tracking requires a running Tokio runtime")]
    NoRuntime,
}

/// Errors emitted by `PreferenceController` setters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesError {
    #[error(transparent)]
    Invalid(#[from] PreferenceError),
    #[error("saving preferences requires a running Tokio runtime")]
    NoRuntime,
}

/// Errors emitted by `DashboardService`.
///
/// Unlike playback writes, a failed listing is surfaced: it is the whole
/// content of the dashboard and the caller should offer a retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("failed to load progress listing: {0}")]
    Listing(#[source] StoreError),
}

impl DashboardError {
    /// Whether retrying the same load could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::Listing(err) => err.is_transient(),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
