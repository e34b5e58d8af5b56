//! Reconciles heterogeneous progress payloads into the canonical model.
//!
//! Pure functions only: nothing here performs I/O, and a missing or malformed
//! field degrades to a computed or zero default instead of failing the pass.

mod course;
mod fields;
mod stats;

use chrono::{DateTime, Utc};
use progress_core::model::{AggregatedCourseProgress, AggregatedUserStats, QuizAttempt};
use serde::Serialize;
use serde_json::Value;

pub use course::{aggregate_courses, next_lesson, normalize_course, normalize_lesson};
pub use stats::{
    COMPLETED_THRESHOLD, CourseStatus, aggregate_quizzes, aggregate_stats, average_quiz_score,
    normalize_quiz,
};

const LISTING_COURSES: &[&str] = &["courses", "enrollments", "data.courses"];
const LISTING_QUIZZES: &[&str] = &[
    "recentQuizzes",
    "recent_quizzes",
    "quizzes",
    "quizAttempts",
    "quiz_attempts",
    "data.recentQuizzes",
];

/// Everything the dashboard renders, derived from one listing payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedDashboard {
    pub courses: Vec<AggregatedCourseProgress>,
    pub quizzes: Vec<QuizAttempt>,
    pub stats: AggregatedUserStats,
}

/// Aggregate a raw dashboard listing (`{ courses, recentQuizzes }`).
///
/// Missing collections are treated as empty.
#[must_use]
pub fn aggregate_listing(root: &Value, now: DateTime<Utc>) -> AggregatedDashboard {
    let courses = fields::array(root, LISTING_COURSES)
        .map(|raw| aggregate_courses(raw, now))
        .unwrap_or_default();
    let quizzes = fields::array(root, LISTING_QUIZZES)
        .map(|raw| aggregate_quizzes(raw))
        .unwrap_or_default();
    let stats = aggregate_stats(&courses, &quizzes);
    AggregatedDashboard {
        courses,
        quizzes,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::time::fixed_now;
    use serde_json::json;

    #[test]
    fn aggregates_a_mixed_shape_listing() {
        let root = json!({
            "courses": [
                { "id": 1, "title": "Async Rust", "overallProgress": 99.6 },
                { "course_id": 2, "course_title": "Macros", "lessons": [
                    { "lesson_id": 20, "progress": 50, "is_completed": false }
                ]}
            ],
            "recent_quizzes": [
                { "score": 8, "maxScore": 10 },
                { "score": 0, "maxScore": 0 }
            ]
        });
        let dashboard = aggregate_listing(&root, fixed_now());

        assert_eq!(dashboard.courses.len(), 2);
        assert_eq!(dashboard.courses[1].course_title, "Macros");
        assert_eq!(dashboard.courses[1].overall_progress, 50.0);
        assert_eq!(dashboard.stats.courses_completed, 1);
        assert_eq!(dashboard.stats.quiz_attempts, 2);
        assert_eq!(dashboard.stats.average_quiz_score, 80.0);
    }

    #[test]
    fn empty_or_unexpected_root_yields_empty_dashboard() {
        let dashboard = aggregate_listing(&json!({ "courses": "nope" }), fixed_now());
        assert!(dashboard.courses.is_empty());
        assert_eq!(dashboard.stats, AggregatedUserStats::default());
    }
}
