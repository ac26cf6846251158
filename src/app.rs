//! Application state and initialization
//!
//! This module wires the services together and owns the engine lifecycle.
//! The host shell constructs one `AppState` on mount and calls `shutdown`
//! on unmount; both directions are safe to invoke more than once.

use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    AppSettings, CategoryService, EventBus, IngestService, ItemService, ItemStore, TagService,
};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub repo: Repository,
    pub settings: Arc<RwLock<AppSettings>>,
    pub events: EventBus,
    pub store: Arc<ItemStore>,
    pub items: ItemService,
    pub categories: CategoryService,
    pub tags: TagService,
    pub ingest: IngestService,
}

impl AppState {
    /// Engine setup — called once when the host shell mounts.
    pub async fn initialize(app_data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing clipvault engine");
        tracing::info!("App data directory: {:?}", app_data_dir);

        std::fs::create_dir_all(&app_data_dir)?;
        std::fs::create_dir_all(app_data_dir.join("images"))?;

        let pool = create_pool(&app_data_dir.join("clipvault.db")).await?;
        let repo = Repository::new(pool);

        let settings = Arc::new(RwLock::new(AppSettings::load(&app_data_dir).await?));
        let events = EventBus::new();
        let store = ItemStore::new();

        let items = ItemService::new(repo.clone(), Arc::clone(&store));
        let categories = CategoryService::new(repo.clone(), Arc::clone(&store), events.clone());
        let tags = TagService::new(repo.clone(), Arc::clone(&store), events.clone());
        let ingest = IngestService::new(repo.clone(), items.clone(), Arc::clone(&settings));

        categories.ensure_builtins().await?;
        tags.ensure_defaults().await?;

        let limit = settings.read().unwrap().history_limit();
        items.reload(limit).await?;

        let auto_start = settings.read().unwrap().auto_start_monitoring;
        if auto_start {
            ingest.start().await;
        }

        tracing::info!("Engine initialized successfully");

        Ok(Self {
            app_data_dir,
            repo,
            settings,
            events,
            store,
            items,
            categories,
            tags,
            ingest,
        })
    }

    /// Persist updated settings and apply them in memory.
    pub async fn update_settings(&self, settings: AppSettings) -> Result<()> {
        settings.save(&self.app_data_dir).await?;
        *self.settings.write().unwrap() = settings;
        Ok(())
    }

    /// Engine teardown — called when the host shell unmounts. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down clipvault engine");
        self.ingest.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_seeds_catalogs_and_auto_starts() {
        let dir = TempDir::new().unwrap();

        let state = AppState::initialize(dir.path().to_path_buf()).await.unwrap();

        assert!(!state.categories.list().is_empty());
        assert!(!state.tags.list().is_empty());
        assert!(state.ingest.is_running());

        state.shutdown();
        assert!(!state.ingest.is_running());
        state.shutdown();
    }

    #[tokio::test]
    async fn test_auto_start_disabled_respected() {
        let dir = TempDir::new().unwrap();

        let mut settings = AppSettings::default();
        settings.auto_start_monitoring = false;
        settings.save(dir.path()).await.unwrap();

        let state = AppState::initialize(dir.path().to_path_buf()).await.unwrap();
        assert!(!state.ingest.is_running());
    }
}
