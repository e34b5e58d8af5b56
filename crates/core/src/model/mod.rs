mod chapter;
mod dashboard;
mod ids;
mod preferences;
mod progress;

pub use ids::{CourseId, LessonId, ParseIdError, QuizId, UserId};

pub use chapter::{ChapterMarker, chapter_at, sort_chapters};
pub use dashboard::{
    AggregatedCourseProgress, AggregatedUserStats, LessonSummary, NextLesson, QuizAttempt,
};
pub use preferences::{
    DEFAULT_CAPTION_LANGUAGE, DEFAULT_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED, PreferenceError,
    PreferenceRecord, PreferenceUpdate, VideoQuality, validate_speed,
};
pub use progress::{
    COMPLETION_THRESHOLD, ProgressRecord, ProgressUpdate, completion_percentage, is_completed,
};
