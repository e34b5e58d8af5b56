use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;

/// A titled section of a lesson video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMarker {
    #[serde(alias = "lesson_id")]
    pub lesson_id: LessonId,
    pub title: String,
    #[serde(alias = "start_time")]
    pub start_time: f64,
    #[serde(default, alias = "end_time")]
    pub end_time: Option<f64>,
    #[serde(default, alias = "order_index")]
    pub order_index: u32,
}

/// Order chapters by `order_index`, then by `start_time`.
pub fn sort_chapters(chapters: &mut [ChapterMarker]) {
    chapters.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.start_time.partial_cmp(&b.start_time).unwrap_or(Ordering::Equal))
    });
}

/// Find the chapter playing at `position`.
///
/// Expects `chapters` in display order. A chapter without `end_time` runs until
/// the next chapter starts (or the end of the video for the last one).
#[must_use]
pub fn chapter_at(chapters: &[ChapterMarker], position: f64) -> Option<&ChapterMarker> {
    chapters.iter().enumerate().rev().find_map(|(idx, chapter)| {
        if position < chapter.start_time {
            return None;
        }
        let end = chapter
            .end_time
            .or_else(|| chapters.get(idx + 1).map(|next| next.start_time));
        match end {
            Some(end) if position >= end => None,
            _ => Some(chapter),
        }
    })
}
