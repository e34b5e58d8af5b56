use std::sync::Arc;

use progress_core::Clock;
use progress_core::model::{AggregatedCourseProgress, CourseId, NextLesson};
use storage::CourseListing;

use crate::aggregate::{AggregatedDashboard, aggregate_listing, next_lesson};
use crate::error::DashboardError;

use super::view::{SortKey, StatusFilter, present};

/// Loads the progress listing and exposes display-ready views of it.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    listing: Arc<dyn CourseListing>,
}

impl DashboardService {
    #[must_use]
    pub fn new(clock: Clock, listing: Arc<dyn CourseListing>) -> Self {
        Self { clock, listing }
    }

    /// Fetch and aggregate the listing.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Listing` when the listing cannot be fetched;
    /// malformed course entries are absorbed by aggregation instead.
    pub async fn load(&self) -> Result<DashboardSnapshot, DashboardError> {
        let raw = self.listing.get_dashboard_listing().await.map_err(|err| {
            tracing::warn!(error = %err, "progress listing failed");
            DashboardError::Listing(err)
        })?;
        let dashboard = aggregate_listing(&raw, self.clock.now());
        tracing::debug!(
            courses = dashboard.courses.len(),
            quizzes = dashboard.quizzes.len(),
            "progress listing aggregated"
        );
        Ok(DashboardSnapshot { dashboard })
    }
}

/// One aggregation pass, ready to be sorted and filtered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub dashboard: AggregatedDashboard,
}

impl DashboardSnapshot {
    #[must_use]
    pub fn view(&self, sort: SortKey, filter: StatusFilter) -> Vec<AggregatedCourseProgress> {
        present(&self.dashboard.courses, sort, filter)
    }

    #[must_use]
    pub fn next_lesson(&self, course_id: CourseId) -> Option<NextLesson> {
        self.dashboard
            .courses
            .iter()
            .find(|course| course.course_id == Some(course_id))
            .map(next_lesson)
    }
}
