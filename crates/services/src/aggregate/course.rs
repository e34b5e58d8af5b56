use chrono::{DateTime, Utc};
use progress_core::model::{AggregatedCourseProgress, CourseId, LessonId, LessonSummary, NextLesson};
use serde_json::Value;

use super::fields;

const COURSE_ID: &[&str] = &["courseId", "course_id", "course.id", "id"];
const COURSE_TITLE: &[&str] = &["courseTitle", "course_title", "title", "course.title", "name"];
const LESSONS: &[&str] = &[
    "lessons",
    "lessonProgress",
    "lesson_progress",
    "course.lessons",
];
const TOTAL_LESSONS: &[&str] = &[
    "totalLessons",
    "total_lessons",
    "lessonCount",
    "lesson_count",
    "course.totalLessons",
    "course.total_lessons",
];
const COMPLETED_LESSONS: &[&str] = &[
    "completedLessons",
    "completed_lessons",
    "lessonsCompleted",
    "lessons_completed",
];
const OVERALL_PROGRESS: &[&str] = &[
    "overallProgress",
    "overall_progress",
    "progressPercentage",
    "progress_percentage",
    "completionPercentage",
    "completion_percentage",
    "progress",
];
const COURSE_LAST_ACCESSED: &[&str] = &[
    "lastAccessed",
    "last_accessed",
    "lastAccessedAt",
    "last_accessed_at",
];

const LESSON_ID: &[&str] = &["lessonId", "lesson_id", "lesson.id", "id"];
const LESSON_TITLE: &[&str] = &["title", "lessonTitle", "lesson_title", "lesson.title", "name"];
const LESSON_PROGRESS: &[&str] = &[
    "progress",
    "progressPercentage",
    "progress_percentage",
    "completionPercentage",
    "completion_percentage",
    "progress.completionPercentage",
    "progress.completion_percentage",
];
const LESSON_COMPLETED: &[&str] = &[
    "isCompleted",
    "is_completed",
    "completed",
    "progress.completed",
];
const LESSON_LAST_ACCESSED: &[&str] = &[
    "lastAccessedAt",
    "last_accessed_at",
    "lastWatchedAt",
    "last_watched_at",
    "progress.lastWatchedAt",
    "progress.last_watched_at",
];

fn clamp_percentage(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Normalize one lesson entry. Returns `None` for non-object entries.
#[must_use]
pub fn normalize_lesson(raw: &Value) -> Option<LessonSummary> {
    if !raw.is_object() {
        return None;
    }
    Some(LessonSummary {
        lesson_id: fields::id(raw, LESSON_ID).map(LessonId::new),
        title: fields::text(raw, LESSON_TITLE).unwrap_or_default(),
        progress: fields::number(raw, LESSON_PROGRESS).map_or(0.0, clamp_percentage),
        is_completed: fields::boolean(raw, LESSON_COMPLETED).unwrap_or(false),
        last_accessed_at: fields::timestamp(raw, LESSON_LAST_ACCESSED),
    })
}

/// Normalize one course entry into the canonical model.
///
/// Fallback chains, in order:
/// - total lessons: explicit count, then the lesson list length, then 0;
/// - completed lessons: explicit count, then lessons flagged completed, then 0;
/// - overall progress: explicit number, then the mean lesson progress, then 0;
/// - last accessed: explicit timestamp, then the latest lesson access, then `now`.
///
/// Returns `None` for non-object entries.
#[must_use]
pub fn normalize_course(raw: &Value, now: DateTime<Utc>) -> Option<AggregatedCourseProgress> {
    if !raw.is_object() {
        return None;
    }

    let lessons: Vec<LessonSummary> = fields::array(raw, LESSONS)
        .map(|items| items.iter().filter_map(normalize_lesson).collect())
        .unwrap_or_default();

    let listed = u32::try_from(lessons.len()).unwrap_or(u32::MAX);
    let total_lessons = fields::count(raw, TOTAL_LESSONS).unwrap_or(listed);

    let completed_lessons = fields::count(raw, COMPLETED_LESSONS).unwrap_or_else(|| {
        let done = lessons.iter().filter(|lesson| lesson.is_completed).count();
        u32::try_from(done).unwrap_or(u32::MAX)
    });

    let overall_progress = match fields::number(raw, OVERALL_PROGRESS) {
        Some(explicit) => clamp_percentage(explicit),
        None if total_lessons > 0 && !lessons.is_empty() => {
            let sum: f64 = lessons.iter().map(|lesson| lesson.progress).sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / lessons.len() as f64;
            clamp_percentage(mean)
        }
        None => 0.0,
    };

    let last_accessed = fields::timestamp(raw, COURSE_LAST_ACCESSED)
        .or_else(|| lessons.iter().filter_map(|l| l.last_accessed_at).max())
        .unwrap_or(now);

    Some(AggregatedCourseProgress {
        course_id: fields::id(raw, COURSE_ID).map(CourseId::new),
        course_title: fields::text(raw, COURSE_TITLE).unwrap_or_default(),
        total_lessons,
        completed_lessons,
        overall_progress,
        last_accessed,
        lessons,
    })
}

/// Normalize every course entry, skipping ones that are not objects.
#[must_use]
pub fn aggregate_courses(raw: &[Value], now: DateTime<Utc>) -> Vec<AggregatedCourseProgress> {
    raw.iter()
        .filter_map(|course| normalize_course(course, now))
        .collect()
}

/// Resolve where "continue" should go for a course.
///
/// The first unfinished lesson in list order; if all are finished, the first
/// lesson; with no lessons at all, the course page.
#[must_use]
pub fn next_lesson(course: &AggregatedCourseProgress) -> NextLesson {
    course
        .lessons
        .iter()
        .find(|lesson| !lesson.is_completed)
        .or_else(|| course.lessons.first())
        .map_or(
            NextLesson::Course {
                course_id: course.course_id,
            },
            |lesson| NextLesson::Lesson {
                course_id: course.course_id,
                lesson_id: lesson.lesson_id,
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::time::fixed_now;
    use serde_json::json;

    #[test]
    fn empty_course_has_zero_progress() {
        let course = normalize_course(&json!({ "id": 1, "title": "Empty", "totalLessons": 0 }), fixed_now())
            .unwrap();
        assert_eq!(course.total_lessons, 0);
        assert_eq!(course.completed_lessons, 0);
        assert_eq!(course.overall_progress, 0.0);
    }

    #[test]
    fn derives_progress_from_lessons_when_not_supplied() {
        let raw = json!({
            "id": 9,
            "title": "Ownership",
            "lessons": [
                { "id": 1, "progress": 100, "isCompleted": true },
                { "id": 2, "progress": 50, "isCompleted": false }
            ]
        });
        let course = normalize_course(&raw, fixed_now()).unwrap();
        assert_eq!(course.total_lessons, 2);
        assert_eq!(course.completed_lessons, 1);
        assert_eq!(course.overall_progress, 75.0);
        assert_eq!(
            next_lesson(&course),
            NextLesson::Lesson {
                course_id: Some(CourseId::new(9)),
                lesson_id: Some(LessonId::new(2)),
            }
        );
    }

    #[test]
    fn explicit_fields_take_precedence() {
        let raw = json!({
            "course_id": "4",
            "course": { "title": "Lifetimes" },
            "total_lessons": 10,
            "completed_lessons": 3,
            "overall_progress": "33.3",
            "lessons": [{ "progress": 100, "is_completed": true }]
        });
        let course = normalize_course(&raw, fixed_now()).unwrap();
        assert_eq!(course.course_id, Some(CourseId::new(4)));
        assert_eq!(course.course_title, "Lifetimes");
        assert_eq!(course.total_lessons, 10);
        assert_eq!(course.completed_lessons, 3);
        assert!((course.overall_progress - 33.3).abs() < 1e-9);
    }

    #[test]
    fn missing_lesson_progress_counts_as_zero() {
        let raw = json!({ "lessons": [{ "progress": 80 }, { "title": "untouched" }] });
        let course = normalize_course(&raw, fixed_now()).unwrap();
        assert_eq!(course.overall_progress, 40.0);
    }

    #[test]
    fn nested_progress_objects_are_read() {
        let raw = json!({
            "lesson_progress": [
                { "lesson": { "id": 5, "title": "Traits" },
                  "progress": { "completionPercentage": 60, "completed": false } }
            ]
        });
        let course = normalize_course(&raw, fixed_now()).unwrap();
        let lesson = &course.lessons[0];
        assert_eq!(lesson.lesson_id, Some(LessonId::new(5)));
        assert_eq!(lesson.title, "Traits");
        assert_eq!(lesson.progress, 60.0);
        assert_eq!(course.overall_progress, 60.0);
    }

    #[test]
    fn last_accessed_falls_back_to_latest_lesson_then_now() {
        let raw = json!({
            "lessons": [
                { "lastAccessedAt": "2024-01-01T00:00:00Z" },
                { "lastAccessedAt": "2024-02-01T00:00:00Z" }
            ]
        });
        let course = normalize_course(&raw, fixed_now()).unwrap();
        assert_eq!(course.last_accessed.to_rfc3339(), "2024-02-01T00:00:00+00:00");

        let fresh = normalize_course(&json!({ "title": "New" }), fixed_now()).unwrap();
        assert_eq!(fresh.last_accessed, fixed_now());
    }

    #[test]
    fn next_lesson_falls_back_to_first_then_course() {
        let done = normalize_course(
            &json!({ "id": 1, "lessons": [
                { "id": 10, "isCompleted": true },
                { "id": 11, "isCompleted": true }
            ]}),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(
            next_lesson(&done),
            NextLesson::Lesson {
                course_id: Some(CourseId::new(1)),
                lesson_id: Some(LessonId::new(10)),
            }
        );

        let empty = normalize_course(&json!({ "id": 2 }), fixed_now()).unwrap();
        assert_eq!(
            next_lesson(&empty),
            NextLesson::Course {
                course_id: Some(CourseId::new(2))
            }
        );
    }

    #[test]
    fn malformed_entries_do_not_abort_the_rest() {
        let raw = vec![
            json!("not a course"),
            json!({ "title": "Ok", "overallProgress": 150, "lessons": "oops" }),
            json!(null),
        ];
        let courses = aggregate_courses(&raw, fixed_now());
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].overall_progress, 100.0);
        assert_eq!(courses[0].total_lessons, 0);
    }
}
