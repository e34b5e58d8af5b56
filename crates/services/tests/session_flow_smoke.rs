use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use progress_core::model::{LessonId, VideoQuality};
use progress_core::time::fixed_clock;
use serde_json::json;
use services::{AppServices, SortKey, StatusFilter, TrackerConfig};
use storage::InMemoryProgressStore;

fn services(store: &InMemoryProgressStore) -> AppServices {
    AppServices::new_in_memory(
        store.clone(),
        TrackerConfig {
            clock: fixed_clock(),
            ..TrackerConfig::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn watching_a_lesson_persists_progress_and_completion() {
    let store = InMemoryProgressStore::new().with_clock(fixed_clock());
    let app = services(&store);
    let lesson = LessonId::new(12);

    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);
    let mut tracker = app
        .tracker()
        .with_on_complete(Arc::new(move |_: LessonId| flag.store(true, Ordering::SeqCst)));

    tracker.start(lesson, None).unwrap();
    for second in 1..=25_u32 {
        tracker.on_time_update(f64::from(second) * 4.0, 100.0);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    tracker.stop().unwrap().await.unwrap();

    let record = store.progress(lesson).unwrap();
    assert!(record.completed);
    assert_eq!(record.completion_percentage, 100.0);
    assert!(completed.load(Ordering::SeqCst));
    // Two periodic saves (10 s, 20 s) plus the final flush.
    assert_eq!(store.progress_writes().len(), 3);
}

#[tokio::test]
async fn preferences_round_trip_through_the_store() {
    let store = InMemoryProgressStore::new();
    let app = services(&store);

    app.preferences().load().await;
    app.preferences().set_speed(1.5).unwrap().await.unwrap();
    app.preferences()
        .set_quality(VideoQuality::P1080)
        .unwrap()
        .await
        .unwrap();

    let reloaded = services(&store).preferences().load().await;
    assert_eq!(reloaded.playback_speed, 1.5);
    assert_eq!(reloaded.preferred_quality, VideoQuality::P1080);
}

#[tokio::test]
async fn dashboard_reflects_listing() {
    let store = InMemoryProgressStore::new();
    store.set_listing(json!({
        "success": true,
        "courses": [
            { "id": 1, "title": "Zero", "totalLessons": 0 },
            { "id": 2, "title": "Almost", "overallProgress": 99.6 }
        ],
        "recentQuizzes": [{ "score": 8, "maxScore": 10 }, { "score": 0, "maxScore": 0 }]
    }));
    let app = services(&store);

    let snapshot = app.dashboard().load().await.unwrap();
    let completed = snapshot.view(SortKey::Title, StatusFilter::Completed);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].course_title, "Almost");
    assert_eq!(snapshot.dashboard.stats.average_quiz_score, 80.0);
    assert_eq!(snapshot.dashboard.courses[0].overall_progress, 0.0);
}
