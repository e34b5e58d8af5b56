use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::{CourseId, LessonId, QuizId};

/// Canonical per-lesson row of an aggregated course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub lesson_id: Option<LessonId>,
    pub title: String,
    pub progress: f64,
    pub is_completed: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

/// Course progress reconciled from whatever shape the backend returned.
///
/// Derived on every aggregation pass and never written back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedCourseProgress {
    pub course_id: Option<CourseId>,
    pub course_title: String,
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub overall_progress: f64,
    pub last_accessed: DateTime<Utc>,
    pub lessons: Vec<LessonSummary>,
}

/// Where "continue learning" should send the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NextLesson {
    Lesson {
        course_id: Option<CourseId>,
        lesson_id: Option<LessonId>,
    },
    Course {
        course_id: Option<CourseId>,
    },
}

/// One quiz result from the listing; score fields may be missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub quiz_id: Option<QuizId>,
    pub title: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
}

impl QuizAttempt {
    /// Score as a percentage, or `None` when the quiz has no usable maximum.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        let max = self.max_score.filter(|max| max.is_finite() && *max > 0.0)?;
        Some(self.score.unwrap_or(0.0) / max * 100.0)
    }
}

/// Learner-wide totals shown on the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedUserStats {
    pub courses_enrolled: u32,
    pub courses_completed: u32,
    pub courses_in_progress: u32,
    pub lessons_completed: u32,
    pub total_lessons: u32,
    pub quiz_attempts: u32,
    pub average_quiz_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_percentage_skips_missing_or_zero_max() {
        let quiz = |score, max_score| QuizAttempt {
            quiz_id: None,
            title: None,
            score,
            max_score,
        };
        assert_eq!(quiz(Some(8.0), Some(10.0)).percentage(), Some(80.0));
        assert_eq!(quiz(Some(0.0), Some(0.0)).percentage(), None);
        assert_eq!(quiz(Some(5.0), None).percentage(), None);
        assert_eq!(quiz(None, Some(10.0)).percentage(), Some(0.0));
    }

    #[test]
    fn next_lesson_serializes_with_kind_tag() {
        let next = NextLesson::Course {
            course_id: Some(CourseId::new(3)),
        };
        let json = serde_json::to_value(next).unwrap();
        assert_eq!(json["kind"], "course");
        assert_eq!(json["courseId"], 3);
    }
}
