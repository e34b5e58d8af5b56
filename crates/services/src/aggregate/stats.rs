use progress_core::model::{AggregatedCourseProgress, AggregatedUserStats, QuizAttempt, QuizId};
use serde_json::Value;

use super::fields;

/// Progress at or above which a course counts as completed.
///
/// Lower than 100 so that mean-of-lessons rounding error still reads as done.
pub const COMPLETED_THRESHOLD: f64 = 99.5;

const QUIZ_ID: &[&str] = &["quizId", "quiz_id", "quiz.id", "id"];
const QUIZ_TITLE: &[&str] = &["quizTitle", "quiz_title", "title", "quiz.title"];
const QUIZ_SCORE: &[&str] = &["score", "obtainedScore", "obtained_score", "points"];
const QUIZ_MAX_SCORE: &[&str] = &[
    "maxScore",
    "max_score",
    "totalPoints",
    "total_points",
    "quiz.maxScore",
    "quiz.max_score",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl CourseStatus {
    #[must_use]
    pub fn of(overall_progress: f64) -> Self {
        if overall_progress >= COMPLETED_THRESHOLD {
            CourseStatus::Completed
        } else if overall_progress > 0.0 {
            CourseStatus::InProgress
        } else {
            CourseStatus::NotStarted
        }
    }
}

/// Normalize one quiz entry. Returns `None` for non-object entries.
#[must_use]
pub fn normalize_quiz(raw: &Value) -> Option<QuizAttempt> {
    if !raw.is_object() {
        return None;
    }
    Some(QuizAttempt {
        quiz_id: fields::id(raw, QUIZ_ID).map(QuizId::new),
        title: fields::text(raw, QUIZ_TITLE),
        score: fields::number(raw, QUIZ_SCORE),
        max_score: fields::number(raw, QUIZ_MAX_SCORE),
    })
}

#[must_use]
pub fn aggregate_quizzes(raw: &[Value]) -> Vec<QuizAttempt> {
    raw.iter().filter_map(normalize_quiz).collect()
}

/// Rounded mean quiz percentage.
///
/// Quizzes without a positive `max_score` are left out entirely rather than
/// counted as zero. Returns 0 when no quiz qualifies.
#[must_use]
pub fn average_quiz_score(quizzes: &[QuizAttempt]) -> f64 {
    let scored: Vec<f64> = quizzes.iter().filter_map(QuizAttempt::percentage).collect();
    if scored.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = scored.iter().sum::<f64>() / scored.len() as f64;
    mean.round()
}

#[must_use]
pub fn aggregate_stats(
    courses: &[AggregatedCourseProgress],
    quizzes: &[QuizAttempt],
) -> AggregatedUserStats {
    let mut stats = AggregatedUserStats {
        courses_enrolled: u32::try_from(courses.len()).unwrap_or(u32::MAX),
        quiz_attempts: u32::try_from(quizzes.len()).unwrap_or(u32::MAX),
        average_quiz_score: average_quiz_score(quizzes),
        ..AggregatedUserStats::default()
    };
    for course in courses {
        stats.lessons_completed = stats.lessons_completed.saturating_add(course.completed_lessons);
        stats.total_lessons = stats.total_lessons.saturating_add(course.total_lessons);
        match CourseStatus::of(course.overall_progress) {
            CourseStatus::Completed => stats.courses_completed += 1,
            CourseStatus::InProgress => stats.courses_in_progress += 1,
            CourseStatus::NotStarted => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::time::fixed_now;
    use serde_json::json;

    use crate::aggregate::aggregate_courses;

    #[test]
    fn zero_max_score_is_excluded_not_zeroed() {
        let quizzes = aggregate_quizzes(&[
            json!({ "score": 8, "maxScore": 10 }),
            json!({ "score": 0, "maxScore": 0 }),
        ]);
        assert_eq!(average_quiz_score(&quizzes), 80.0);
    }

    #[test]
    fn missing_max_score_is_excluded() {
        let quizzes = aggregate_quizzes(&[
            json!({ "score": 3, "max_score": 4 }),
            json!({ "score": 5 }),
            json!({ "score": 1, "total_points": 2 }),
        ]);
        assert_eq!(average_quiz_score(&quizzes), 63.0);
        assert_eq!(quizzes.len(), 3);
    }

    #[test]
    fn no_scored_quizzes_average_zero() {
        assert_eq!(average_quiz_score(&[]), 0.0);
        let quizzes = aggregate_quizzes(&[json!({ "score": 3 })]);
        assert_eq!(average_quiz_score(&quizzes), 0.0);
    }

    #[test]
    fn status_threshold_absorbs_rounding() {
        assert_eq!(CourseStatus::of(99.6), CourseStatus::Completed);
        assert_eq!(CourseStatus::of(99.4), CourseStatus::InProgress);
        assert_eq!(CourseStatus::of(0.0), CourseStatus::NotStarted);
    }

    #[test]
    fn stats_sum_across_courses() {
        let courses = aggregate_courses(
            &[
                json!({ "totalLessons": 4, "completedLessons": 4, "overallProgress": 100 }),
                json!({ "totalLessons": 5, "completedLessons": 2, "overallProgress": 40 }),
                json!({ "totalLessons": 3 }),
            ],
            fixed_now(),
        );
        let quizzes = aggregate_quizzes(&[json!({ "quizId": 1, "score": 9, "maxScore": 10 })]);
        let stats = aggregate_stats(&courses, &quizzes);

        assert_eq!(stats.courses_enrolled, 3);
        assert_eq!(stats.courses_completed, 1);
        assert_eq!(stats.courses_in_progress, 1);
        assert_eq!(stats.lessons_completed, 6);
        assert_eq!(stats.total_lessons, 12);
        assert_eq!(stats.quiz_attempts, 1);
        assert_eq!(stats.average_quiz_score, 90.0);
    }
}
