use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use progress_core::model::AggregatedCourseProgress;

use crate::aggregate::CourseStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most recently accessed first.
    #[default]
    LastAccessed,
    /// Case-insensitive title order.
    Title,
    /// Highest overall progress first.
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Started but below the completed threshold.
    InProgress,
    Completed,
}

/// Error type for parsing a sort key or status filter from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseViewError {
    kind: &'static str,
    raw: String,
}

impl fmt::Display for ParseViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.raw)
    }
}

impl std::error::Error for ParseViewError {}

impl FromStr for SortKey {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_accessed" | "recent" | "lastaccessed" => Ok(SortKey::LastAccessed),
            "title" => Ok(SortKey::Title),
            "completion" | "progress" => Ok(SortKey::Completion),
            _ => Err(ParseViewError {
                kind: "sort key",
                raw: s.to_string(),
            }),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "in_progress" | "in-progress" => Ok(StatusFilter::InProgress),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(ParseViewError {
                kind: "status filter",
                raw: s.to_string(),
            }),
        }
    }
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, course: &AggregatedCourseProgress) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::InProgress => {
                CourseStatus::of(course.overall_progress) == CourseStatus::InProgress
            }
            StatusFilter::Completed => {
                CourseStatus::of(course.overall_progress) == CourseStatus::Completed
            }
        }
    }
}

fn compare(sort: SortKey, a: &AggregatedCourseProgress, b: &AggregatedCourseProgress) -> Ordering {
    match sort {
        SortKey::LastAccessed => b.last_accessed.cmp(&a.last_accessed),
        SortKey::Title => a
            .course_title
            .to_lowercase()
            .cmp(&b.course_title.to_lowercase())
            .then_with(|| a.course_title.cmp(&b.course_title)),
        SortKey::Completion => b.overall_progress.total_cmp(&a.overall_progress),
    }
}

/// Filter then sort courses for display. Ties keep aggregation order.
#[must_use]
pub fn present(
    courses: &[AggregatedCourseProgress],
    sort: SortKey,
    filter: StatusFilter,
) -> Vec<AggregatedCourseProgress> {
    let mut visible: Vec<AggregatedCourseProgress> = courses
        .iter()
        .filter(|course| filter.matches(course))
        .cloned()
        .collect();
    visible.sort_by(|a, b| compare(sort, a, b));
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use progress_core::time::fixed_now;

    fn course(title: &str, progress: f64, hours_ago: i64) -> AggregatedCourseProgress {
        AggregatedCourseProgress {
            course_id: None,
            course_title: title.to_string(),
            total_lessons: 1,
            completed_lessons: 0,
            overall_progress: progress,
            last_accessed: fixed_now() - Duration::hours(hours_ago),
            lessons: Vec::new(),
        }
    }

    fn titles(courses: &[AggregatedCourseProgress]) -> Vec<&str> {
        courses.iter().map(|c| c.course_title.as_str()).collect()
    }

    fn sample() -> Vec<AggregatedCourseProgress> {
        vec![
            course("beta", 50.0, 5),
            course("Alpha", 99.6, 1),
            course("gamma", 0.0, 10),
            course("Delta", 100.0, 3),
        ]
    }

    #[test]
    fn default_sort_is_most_recent_first() {
        let shown = present(&sample(), SortKey::default(), StatusFilter::default());
        assert_eq!(titles(&shown), vec!["Alpha", "Delta", "beta", "gamma"]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let shown = present(&sample(), SortKey::Title, StatusFilter::All);
        assert_eq!(titles(&shown), vec!["Alpha", "beta", "Delta", "gamma"]);
    }

    #[test]
    fn completion_sort_is_descending() {
        let shown = present(&sample(), SortKey::Completion, StatusFilter::All);
        assert_eq!(titles(&shown), vec!["Delta", "Alpha", "beta", "gamma"]);
    }

    #[test]
    fn completed_filter_uses_99_5_threshold() {
        let shown = present(&sample(), SortKey::Title, StatusFilter::Completed);
        assert_eq!(titles(&shown), vec!["Alpha", "Delta"]);
    }

    #[test]
    fn in_progress_excludes_untouched_and_finished() {
        let shown = present(&sample(), SortKey::Title, StatusFilter::InProgress);
        assert_eq!(titles(&shown), vec!["beta"]);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("recent".parse::<SortKey>().unwrap(), SortKey::LastAccessed);
        assert_eq!("in_progress".parse::<StatusFilter>().unwrap(), StatusFilter::InProgress);
        let err = "newest".parse::<SortKey>().unwrap_err();
        assert_eq!(err.to_string(), "unknown sort key: newest");
    }
}
