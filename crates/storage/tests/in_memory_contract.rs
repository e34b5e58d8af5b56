use std::sync::Arc;

use progress_core::model::{ChapterMarker, LessonId, ProgressUpdate};
use storage::{CourseListing, InMemoryProgressStore, ProgressStore};

#[tokio::test]
async fn store_is_usable_behind_trait_objects() {
    let memory = InMemoryProgressStore::new();
    let store: Arc<dyn ProgressStore> = Arc::new(memory.clone());
    let listing: Arc<dyn CourseListing> = Arc::new(memory.clone());
    let lesson = LessonId::new(3);

    assert!(store.get_progress(lesson).await.unwrap().is_none());
    store
        .upsert_progress(lesson, &ProgressUpdate::from_position(30.0, 60.0))
        .await
        .unwrap();
    let record = store.get_progress(lesson).await.unwrap().unwrap();
    assert_eq!(record.completion_percentage, 50.0);
    assert!(!record.completed);

    let empty = listing.get_dashboard_listing().await.unwrap();
    assert_eq!(empty["courses"], serde_json::json!([]));
}

#[tokio::test]
async fn chapters_come_back_in_display_order() {
    let memory = InMemoryProgressStore::new();
    let lesson = LessonId::new(8);
    let marker = |order_index: u32, start_time: f64| ChapterMarker {
        lesson_id: lesson,
        title: format!("#{order_index}"),
        start_time,
        end_time: None,
        order_index,
    };
    memory.insert_chapters(lesson, vec![marker(2, 90.0), marker(0, 0.0), marker(1, 45.0)]);

    let chapters = memory.get_chapters(lesson).await.unwrap();
    let order: Vec<u32> = chapters.iter().map(|c| c.order_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
}
