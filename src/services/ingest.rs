//! Clipboard capture ingestion
//!
//! Turns raw capture notifications into durable, deduplicated rows. The
//! queue collapses duplicate observations of the same clipboard state,
//! a single drain pass runs at a time, and each pass ends by reconciling
//! the in-memory projection: full reload when something new was inserted,
//! in-place patch when existing rows were only bumped.

use crate::config::MIN_CAPTURE_LENGTH;
use crate::content_type::detect_content_type;
use crate::database::models::CaptureFields;
use crate::database::Repository;
use crate::services::items::ItemService;
use crate::services::settings::AppSettings;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

/// A clipboard-change notification from the capture collaborator.
///
/// Arrives zero or more times per physical clipboard change, with no
/// uniqueness guarantee. `content_type`/`category` may be pre-detected by
/// the collaborator; when absent they are classified at ingestion time.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureEvent {
    pub content: String,
    pub image_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub content_type: Option<String>,
    pub category: Option<String>,
    pub is_image: bool,
    pub source_app_name: Option<String>,
    pub source_app_icon: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_size: Option<i64>,
    pub dominant_color: Option<String>,
    /// Epoch ms at which the collaborator observed the change.
    pub captured_at: i64,
}

impl CaptureEvent {
    pub fn text(content: impl Into<String>, captured_at: i64) -> Self {
        Self {
            content: content.into(),
            image_path: None,
            thumbnail_path: None,
            content_type: None,
            category: None,
            is_image: false,
            source_app_name: None,
            source_app_icon: None,
            image_width: None,
            image_height: None,
            image_size: None,
            dominant_color: None,
            captured_at,
        }
    }

    pub fn image(image_path: impl Into<String>, captured_at: i64) -> Self {
        Self {
            content: String::new(),
            image_path: Some(image_path.into()),
            thumbnail_path: None,
            content_type: None,
            category: None,
            is_image: true,
            source_app_name: None,
            source_app_icon: None,
            image_width: None,
            image_height: None,
            image_size: None,
            dominant_color: None,
            captured_at,
        }
    }

    /// The duplicate-detection key: image path for images, content
    /// otherwise.
    pub fn identity(&self) -> &str {
        match (&self.image_path, self.is_image) {
            (Some(path), true) => path,
            _ => &self.content,
        }
    }

    /// Fill in classification where the collaborator left it blank.
    fn resolve(self) -> CaptureFields {
        let (content_type, category) = if self.is_image {
            (
                self.content_type.unwrap_or_else(|| "image".to_string()),
                self.category.unwrap_or_else(|| "image".to_string()),
            )
        } else {
            let detected = detect_content_type(&self.content);
            (
                self.content_type
                    .unwrap_or_else(|| detected.as_str().to_string()),
                self.category
                    .unwrap_or_else(|| detected.auto_category().to_string()),
            )
        };

        CaptureFields {
            content: self.content,
            image_path: self.image_path,
            thumbnail_path: self.thumbnail_path,
            content_type,
            category,
            timestamp: self.captured_at,
            source_app_name: self.source_app_name,
            source_app_icon: self.source_app_icon,
            image_width: self.image_width,
            image_height: self.image_height,
            image_size: self.image_size,
            dominant_color: self.dominant_color,
        }
    }
}

/// Listener lifecycle. The host shell may re-invoke setup without tearing
/// down prior state, so both transitions must be idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    Stopped,
    Starting,
    Running,
}

struct IngestState {
    queue: VecDeque<CaptureEvent>,
    /// Identity keys currently waiting in the queue. An identity is
    /// released when its event is popped, so a genuine re-copy arriving
    /// while the previous one persists still gets its bump.
    waiting: HashSet<String>,
    /// Sole drain guard: at most one pass is active.
    processing: bool,
    monitor: MonitorState,
}

/// Service for ingesting clipboard captures
#[derive(Clone)]
pub struct IngestService {
    repo: Repository,
    items: ItemService,
    settings: Arc<RwLock<AppSettings>>,
    state: Arc<Mutex<IngestState>>,
}

impl IngestService {
    pub fn new(repo: Repository, items: ItemService, settings: Arc<RwLock<AppSettings>>) -> Self {
        Self {
            repo,
            items,
            settings,
            state: Arc::new(Mutex::new(IngestState {
                queue: VecDeque::new(),
                waiting: HashSet::new(),
                processing: false,
                monitor: MonitorState::Stopped,
            })),
        }
    }

    /// Attach the listener. A no-op when already started.
    pub async fn start(&self) {
        {
            let mut state = self.state.lock().unwrap();
            match state.monitor {
                MonitorState::Running | MonitorState::Starting => {
                    tracing::debug!("Clipboard monitoring already running");
                    return;
                }
                MonitorState::Stopped => state.monitor = MonitorState::Starting,
            }
        }

        // Prime the projection so the first capture patches against
        // current rows.
        let limit = self.settings.read().unwrap().history_limit();
        if let Err(e) = self.items.reload(limit).await {
            tracing::warn!("Failed to prime item store on start: {}", e);
        }

        self.state.lock().unwrap().monitor = MonitorState::Running;
        tracing::info!("Clipboard monitoring started");
    }

    /// Detach the listener. A no-op when already stopped.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if state.monitor == MonitorState::Stopped {
            tracing::debug!("Clipboard monitoring already stopped");
            return;
        }

        state.monitor = MonitorState::Stopped;
        tracing::info!("Clipboard monitoring stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().monitor == MonitorState::Running
    }

    /// Whether a capture should be ignored before it ever reaches the
    /// queue.
    fn should_ignore(&self, event: &CaptureEvent) -> bool {
        let settings = self.settings.read().unwrap();

        if let Some(app) = &event.source_app_name {
            if settings.exclude_apps.iter().any(|excluded| excluded == app) {
                tracing::debug!("Ignoring capture from excluded app: {}", app);
                return true;
            }
        }

        if event.is_image {
            if !settings.save_images {
                return true;
            }
            if let Some(size) = event.image_size {
                if size > settings.max_image_size_mb as i64 * 1024 * 1024 {
                    tracing::debug!("Ignoring oversized image capture ({} bytes)", size);
                    return true;
                }
            }
            return false;
        }

        if event.content.trim().chars().count() < MIN_CAPTURE_LENGTH {
            return true;
        }

        let lowered = event.content.to_lowercase();
        if settings
            .sensitive_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
        {
            tracing::debug!("Ignoring capture containing a sensitive keyword");
            return true;
        }

        false
    }

    /// Accept a capture notification.
    ///
    /// Duplicates of an identity already waiting in the queue are dropped;
    /// otherwise the event is enqueued and, unless a pass is already
    /// active, this call drains the queue before returning.
    pub async fn submit(&self, event: CaptureEvent) {
        if self.should_ignore(&event) {
            return;
        }

        let should_drain = {
            let mut state = self.state.lock().unwrap();

            if state.monitor != MonitorState::Running {
                tracing::debug!("Dropping capture: monitoring not running");
                return;
            }

            let identity = event.identity().to_string();
            if state.waiting.contains(&identity) {
                // Same physical clipboard state observed twice: keep the
                // queue entry where it is but let the newer observation
                // win, so the persisted timestamp is the most recent one.
                if let Some(queued) = state
                    .queue
                    .iter_mut()
                    .find(|queued| queued.identity() == identity)
                {
                    *queued = event;
                }
                tracing::debug!("Collapsed duplicate capture already queued");
                return;
            }

            state.waiting.insert(identity);
            state.queue.push_back(event);

            if state.processing {
                false
            } else {
                state.processing = true;
                true
            }
        };

        if should_drain {
            self.drain().await;
        }
    }

    /// Drain the queue serially until it stays empty through a
    /// reconciliation step, then release the processing guard.
    async fn drain(&self) {
        loop {
            let mut any_new = false;
            let mut bumps: Vec<(String, CaptureFields)> = Vec::new();

            loop {
                let event = {
                    let mut state = self.state.lock().unwrap();
                    match state.queue.pop_front() {
                        Some(mut event) => {
                            let identity = event.identity().to_string();
                            state.waiting.remove(&identity);

                            // Collapse any later occurrence of the same
                            // identity into this persistence call, keeping
                            // the most recent observation.
                            while let Some(pos) = state
                                .queue
                                .iter()
                                .position(|queued| queued.identity() == identity)
                            {
                                if let Some(later) = state.queue.remove(pos) {
                                    event = later;
                                }
                            }

                            event
                        }
                        None => break,
                    }
                };

                let fields = event.resolve();
                match self.repo.merge_or_insert(&fields).await {
                    Ok(outcome) => {
                        if outcome.is_new {
                            any_new = true;
                        } else {
                            bumps.push((outcome.id, fields));
                        }
                    }
                    Err(e) => {
                        // One failing capture must not abort the pass.
                        tracing::error!("Failed to persist capture: {}", e);
                    }
                }
            }

            if any_new {
                // A fresh row needs the storage-side ordering and defaults.
                let limit = self.settings.read().unwrap().history_limit();
                if let Err(e) = self.items.reload(limit).await {
                    tracing::error!("Failed to reload items after ingest pass: {}", e);
                }
            } else {
                for (id, fields) in bumps {
                    self.items
                        .store()
                        .patch(&id, fields.timestamp, &fields.content_type, &fields.category);
                }
            }

            // Events may have arrived while reconciling; keep the guard
            // and run another pass if so.
            let mut state = self.state.lock().unwrap();
            if state.queue.is_empty() {
                state.processing = false;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUILTIN_CATEGORIES;
    use crate::database::initialize_database;
    use crate::database::repository::HistoryLimit;
    use crate::services::store::ItemStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_ingest() -> IngestService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        for (name, icon, color, sort_order) in BUILTIN_CATEGORIES {
            repo.ensure_builtin_category(name, icon, color, *sort_order)
                .await
                .unwrap();
        }

        let items = ItemService::new(repo.clone(), ItemStore::new());
        let settings = Arc::new(RwLock::new(AppSettings::default()));
        let ingest = IngestService::new(repo, items, settings);
        ingest.start().await;
        ingest
    }

    async fn stored_count(ingest: &IngestService) -> usize {
        ingest
            .repo
            .list_items(HistoryLimit::Unlimited, None)
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_start_stop_idempotence() {
        let ingest = create_test_ingest().await;

        assert!(ingest.is_running());
        ingest.start().await;
        assert!(ingest.is_running());

        ingest.stop();
        assert!(!ingest.is_running());
        ingest.stop();
        assert!(!ingest.is_running());
    }

    #[tokio::test]
    async fn test_submit_while_stopped_persists_nothing() {
        let ingest = create_test_ingest().await;
        ingest.stop();

        ingest.submit(CaptureEvent::text("dropped", 1_000)).await;
        assert_eq!(stored_count(&ingest).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_yield_one_row_with_latest_time() {
        let ingest = create_test_ingest().await;

        let a = ingest.submit(CaptureEvent::text("hello world", 1_000));
        let b = ingest.submit(CaptureEvent::text("hello world", 2_000));
        let c = ingest.submit(CaptureEvent::text("hello world", 3_000));
        tokio::join!(a, b, c);

        let items = ingest
            .repo
            .list_items(HistoryLimit::Unlimited, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].timestamp, 3_000);
    }

    #[tokio::test]
    async fn test_distinct_contents_all_persist() {
        let ingest = create_test_ingest().await;

        let a = ingest.submit(CaptureEvent::text("first thing", 1_000));
        let b = ingest.submit(CaptureEvent::text("second thing", 2_000));
        let c = ingest.submit(CaptureEvent::text("third thing", 3_000));
        tokio::join!(a, b, c);

        assert_eq!(stored_count(&ingest).await, 3);
    }

    #[tokio::test]
    async fn test_new_item_triggers_full_reload() {
        let ingest = create_test_ingest().await;

        ingest.submit(CaptureEvent::text("brand new", 1_000)).await;

        let cached = ingest.items.store().items();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].content, "brand new");
    }

    #[tokio::test]
    async fn test_duplicate_bump_patches_cache_in_place() {
        let ingest = create_test_ingest().await;

        ingest.submit(CaptureEvent::text("older entry", 1_000)).await;
        ingest.submit(CaptureEvent::text("newer entry", 2_000)).await;
        assert_eq!(ingest.items.store().items()[0].content, "newer entry");

        // Re-copying the older entry bumps it to the top without a reload.
        ingest.submit(CaptureEvent::text("older entry", 3_000)).await;

        let cached = ingest.items.store().items();
        assert_eq!(cached[0].content, "older entry");
        assert_eq!(cached[0].timestamp, 3_000);
        assert_eq!(stored_count(&ingest).await, 2);
    }

    #[tokio::test]
    async fn test_classification_attaches_at_ingestion() {
        let ingest = create_test_ingest().await;

        ingest.submit(CaptureEvent::text("hello@test.com", 1_000)).await;

        let cached = ingest.items.store().items();
        assert_eq!(cached[0].content_type, "email");
        assert_eq!(cached[0].category, "email");
    }

    #[tokio::test]
    async fn test_capture_filter_drops_short_and_sensitive_content() {
        let ingest = create_test_ingest().await;

        ingest.submit(CaptureEvent::text("x", 1_000)).await;
        ingest
            .submit(CaptureEvent::text("my PASSWORD is hunter2", 2_000))
            .await;
        ingest
            .submit(CaptureEvent::text("the secret launch codes", 3_000))
            .await;

        assert_eq!(stored_count(&ingest).await, 0);
    }

    #[tokio::test]
    async fn test_capture_filter_respects_excluded_apps() {
        let ingest = create_test_ingest().await;
        ingest
            .settings
            .write()
            .unwrap()
            .exclude_apps
            .push("KeePass".to_string());

        let mut event = CaptureEvent::text("safe content", 1_000);
        event.source_app_name = Some("KeePass".to_string());
        ingest.submit(event).await;

        let mut event = CaptureEvent::text("safe content", 2_000);
        event.source_app_name = Some("Notes".to_string());
        ingest.submit(event).await;

        assert_eq!(stored_count(&ingest).await, 1);
    }

    #[tokio::test]
    async fn test_one_failing_event_does_not_abort_the_pass() {
        let ingest = create_test_ingest().await;

        // A category with no catalog row violates the name FK on insert.
        let mut poisoned = CaptureEvent::text("poisoned capture", 1_000);
        poisoned.category = Some("no-such-category".to_string());

        let a = ingest.submit(poisoned);
        let b = ingest.submit(CaptureEvent::text("healthy capture", 2_000));
        tokio::join!(a, b);

        let items = ingest
            .repo
            .list_items(HistoryLimit::Unlimited, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "healthy capture");

        // The queue is not stuck: later captures still flow.
        ingest.submit(CaptureEvent::text("after failure", 3_000)).await;
        assert_eq!(stored_count(&ingest).await, 2);
    }

    #[tokio::test]
    async fn test_image_identity_dedups_by_path() {
        let ingest = create_test_ingest().await;

        let a = ingest.submit(CaptureEvent::image("/img/shot.png", 1_000));
        let b = ingest.submit(CaptureEvent::image("/img/shot.png", 2_000));
        tokio::join!(a, b);

        let items = ingest
            .repo
            .list_items(HistoryLimit::Unlimited, None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_type, "image");
        assert_eq!(items[0].timestamp, 2_000);
    }

    #[tokio::test]
    async fn test_save_images_disabled_drops_image_captures() {
        let ingest = create_test_ingest().await;
        ingest.settings.write().unwrap().save_images = false;

        ingest.submit(CaptureEvent::image("/img/shot.png", 1_000)).await;
        assert_eq!(stored_count(&ingest).await, 0);
    }
}
