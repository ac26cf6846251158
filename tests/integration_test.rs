//! Integration tests for clipvault
//!
//! These tests verify end-to-end functionality including:
//! - Capture ingestion and deduplication
//! - Canonical ordering under pin/unpin
//! - Category lifecycle and the rename cascade

use clipvault::app::AppState;
use clipvault::database::repository::HistoryLimit;
use clipvault::services::{AppEvent, CaptureEvent};
use tempfile::TempDir;

/// Helper to bring up a full engine on a throwaway data directory.
async fn create_test_engine() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::initialize(temp_dir.path().to_path_buf())
        .await
        .unwrap();

    (state, temp_dir)
}

#[tokio::test]
async fn test_capture_classify_dedup_scenario() {
    let (state, _temp) = create_test_engine().await;

    // Capture an email address: classified and auto-categorized.
    state
        .ingest
        .submit(CaptureEvent::text("hello@test.com", 1_000))
        .await;

    let items = state.store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content_type, "email");
    assert_eq!(items[0].category, "email");

    // Bury it under something newer.
    state
        .ingest
        .submit(CaptureEvent::text("unrelated text", 2_000))
        .await;
    assert_eq!(state.store.items()[0].content, "unrelated text");

    // Re-copying the identical string merges instead of inserting and
    // moves the item back to the top.
    state
        .ingest
        .submit(CaptureEvent::text("hello@test.com", 3_000))
        .await;

    let items = state.store.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].content, "hello@test.com");
    assert_eq!(items[0].timestamp, 3_000);

    let stored = state
        .repo
        .list_items(HistoryLimit::Unlimited, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_rapid_duplicate_burst_yields_single_row() {
    let (state, _temp) = create_test_engine().await;

    let a = state.ingest.submit(CaptureEvent::text("same payload", 1_000));
    let b = state.ingest.submit(CaptureEvent::text("same payload", 2_000));
    let c = state.ingest.submit(CaptureEvent::text("same payload", 3_000));
    let d = state.ingest.submit(CaptureEvent::text("same payload", 4_000));
    tokio::join!(a, b, c, d);

    let stored = state
        .repo
        .list_items(HistoryLimit::Unlimited, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].timestamp, 4_000);
}

#[tokio::test]
async fn test_pin_unpin_scenario() {
    let (state, _temp) = create_test_engine().await;

    state.ingest.submit(CaptureEvent::text("buried item", 1_000)).await;
    for i in 0..10 {
        state
            .ingest
            .submit(CaptureEvent::text(format!("newer item {}", i), 2_000 + i))
            .await;
    }

    let items = state.store.items();
    let buried = items.last().unwrap().clone();
    assert_eq!(buried.content, "buried item");

    // Pinning lifts the item to position 0.
    state.items.set_pinned(&buried.id, true).await.unwrap();
    assert_eq!(state.store.items()[0].id, buried.id);

    // Unpinning drops it back to its timestamp-correct slot.
    state.items.set_pinned(&buried.id, false).await.unwrap();
    let items = state.store.items();
    assert_eq!(items.last().unwrap().id, buried.id);

    // The full ordering invariant holds over every adjacent pair.
    for pair in items.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.is_pinned > b.is_pinned
                || (a.is_pinned == b.is_pinned && a.timestamp >= b.timestamp)
        );
    }
}

#[tokio::test]
async fn test_category_delete_orphans_items_scenario() {
    let (state, _temp) = create_test_engine().await;

    let category = state
        .categories
        .create("Projects", "folder", "#3b82f6")
        .await
        .unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        state
            .ingest
            .submit(CaptureEvent::text(format!("project note {}", i), 1_000 + i))
            .await;
        let id = state.store.items()[0].id.clone();
        state.items.set_category(&id, "Projects").await.unwrap();
        ids.push(id);
    }

    state.categories.delete(&category.id).await.unwrap();

    // The catalog no longer lists it...
    assert!(!state.categories.list().iter().any(|c| c.name == "Projects"));

    // ...but all three items survive with the orphaned name.
    for id in &ids {
        let item = state.repo.get_item(id).await.unwrap();
        assert_eq!(item.category, "Projects");
    }
}

#[tokio::test]
async fn test_rename_cascade_scenario() {
    let (state, _temp) = create_test_engine().await;

    let category = state
        .categories
        .create("Work", "briefcase", "#f59e0b")
        .await
        .unwrap();

    for i in 0..3 {
        state
            .ingest
            .submit(CaptureEvent::text(format!("work doc {}", i), 1_000 + i))
            .await;
        let id = state.store.items()[0].id.clone();
        state.items.set_category(&id, "Work").await.unwrap();
    }
    state
        .ingest
        .submit(CaptureEvent::text("not work", 5_000))
        .await;

    let mut events = state.events.subscribe();
    state
        .categories
        .update(&category.id, "Job", "briefcase", "#f59e0b")
        .await
        .unwrap();

    // Storage: every referencing row moved, none kept the old name.
    let moved = state
        .repo
        .list_items(HistoryLimit::Unlimited, Some("Job"))
        .await
        .unwrap();
    assert_eq!(moved.len(), 3);
    let stale = state
        .repo
        .list_items(HistoryLimit::Unlimited, Some("Work"))
        .await
        .unwrap();
    assert!(stale.is_empty());

    // Cache was patched without a reload.
    assert_eq!(
        state.store.items().iter().filter(|i| i.category == "Job").count(),
        3
    );

    // The rename announced itself to live subscribers.
    match events.recv().await.unwrap() {
        AppEvent::CategoryRenamed {
            old_name, new_name, ..
        } => {
            assert_eq!(old_name, "Work");
            assert_eq!(new_name, "Job");
        }
        other => panic!("expected CategoryRenamed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_metadata_only_rename_touches_no_items() {
    let (state, _temp) = create_test_engine().await;

    let category = state
        .categories
        .create("Work", "briefcase", "#f59e0b")
        .await
        .unwrap();

    state.ingest.submit(CaptureEvent::text("work doc", 1_000)).await;
    let id = state.store.items()[0].id.clone();
    state.items.set_category(&id, "Work").await.unwrap();

    let updated = state
        .categories
        .update(&category.id, "Work", "folder", "#10b981")
        .await
        .unwrap();

    assert_eq!(updated.icon, "folder");
    let item = state.repo.get_item(&id).await.unwrap();
    assert_eq!(item.category, "Work");
}

#[tokio::test]
async fn test_reserved_names_rejected_before_any_write() {
    let (state, _temp) = create_test_engine().await;

    let categories_before = state.categories.list().len();
    let tags_before = state.tags.list().len();

    assert!(state.categories.create("Password", "", "").await.is_err());
    assert!(state.categories.create("text", "", "").await.is_err());
    assert!(state.tags.create("pAsSwOrD", "", "").await.is_err());
    assert!(state.tags.create("favorite", "", "").await.is_err());

    assert_eq!(state.categories.list().len(), categories_before);
    assert_eq!(state.tags.list().len(), tags_before);
}

#[tokio::test]
async fn test_concurrent_category_create_guard() {
    let (state, _temp) = create_test_engine().await;

    let a = state.categories.create("Proj", "folder", "#fff");
    let b = state.categories.create("proj", "folder", "#fff");
    let (a, b) = tokio::join!(a, b);

    assert_ne!(a.is_ok(), b.is_ok(), "exactly one create may succeed");
    let count = state
        .categories
        .list()
        .iter()
        .filter(|c| c.name.eq_ignore_ascii_case("proj"))
        .count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_tag_lifecycle_with_items() {
    let (state, _temp) = create_test_engine().await;

    state.ingest.submit(CaptureEvent::text("tag target", 1_000)).await;
    let item_id = state.store.items()[0].id.clone();

    let tag = state.tags.create("urgent", "flag", "#ef4444").await.unwrap();
    state.items.add_tag(&item_id, &tag.id).await.unwrap();

    let item = state.repo.get_item(&item_id).await.unwrap();
    assert_eq!(item.tags(), vec!["urgent"]);

    // Rename follows the stable id; no item write happened.
    state.tags.update(&tag.id, "critical", "flag", "#ef4444").await.unwrap();
    let item = state.repo.get_item(&item_id).await.unwrap();
    assert_eq!(item.tags(), vec!["critical"]);
    assert_eq!(state.store.get(&item_id).unwrap().tags(), vec!["critical"]);

    // Deleting the tag clears the association on the next read.
    state.tags.delete(&tag.id).await.unwrap();
    let item = state.repo.get_item(&item_id).await.unwrap();
    assert!(item.tags().is_empty());
}

#[tokio::test]
async fn test_history_limit_respected_on_reload() {
    let (state, _temp) = create_test_engine().await;

    for i in 0..10 {
        state
            .ingest
            .submit(CaptureEvent::text(format!("entry number {}", i), 1_000 + i))
            .await;
    }

    let mut settings = state.settings.read().unwrap().clone();
    settings.history_limit = 5;
    state.update_settings(settings).await.unwrap();

    state.items.reload(HistoryLimit::Limited(5)).await.unwrap();
    assert_eq!(state.store.items().len(), 5);
    // The newest entries survive the cut.
    assert_eq!(state.store.items()[0].content, "entry number 9");
}

#[tokio::test]
async fn test_monitoring_survives_host_remount() {
    let (state, _temp) = create_test_engine().await;

    // A hot reload of the host re-invokes setup paths; starting twice must
    // not double-ingest.
    state.ingest.start().await;
    state.ingest.start().await;

    let a = state.ingest.submit(CaptureEvent::text("once only", 1_000));
    let b = state.ingest.submit(CaptureEvent::text("once only", 2_000));
    tokio::join!(a, b);

    let stored = state
        .repo
        .list_items(HistoryLimit::Unlimited, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}
