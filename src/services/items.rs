//! Item operations
//!
//! High-level operations on clipboard items: each writes through the
//! repository, then patches the in-memory projection so the host sees the
//! result without a full reload.

use crate::database::repository::HistoryLimit;
use crate::database::Repository;
use crate::error::Result;
use crate::services::store::ItemStore;
use std::sync::Arc;

/// Service for managing clipboard items
#[derive(Clone)]
pub struct ItemService {
    repo: Repository,
    store: Arc<ItemStore>,
}

impl ItemService {
    pub fn new(repo: Repository, store: Arc<ItemStore>) -> Self {
        Self { repo, store }
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    /// Reload the projection from storage, honoring the history limit.
    pub async fn reload(&self, limit: HistoryLimit) -> Result<()> {
        let items = self.repo.list_items(limit, None).await?;
        tracing::debug!("Reloaded item store ({} items)", items.len());
        self.store.replace(items);
        Ok(())
    }

    /// Soft delete: the row is retained in storage but leaves every view.
    pub async fn delete_item(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting item: {}", id);

        self.repo.soft_delete(id).await?;
        self.store.remove(id);

        Ok(())
    }

    pub async fn set_pinned(&self, id: &str, pinned: bool) -> Result<()> {
        tracing::info!("Setting pinned = {} on item: {}", pinned, id);

        self.repo.set_pinned(id, pinned).await?;
        self.store.set_pinned_cached(id, pinned);

        Ok(())
    }

    pub async fn set_category(&self, id: &str, category: &str) -> Result<()> {
        tracing::info!("Moving item {} to category {}", id, category);

        self.repo.set_item_category(id, category).await?;
        self.store.set_category_cached(id, category);

        Ok(())
    }

    /// Attach a tag; the cached tag-name projection is refreshed from the
    /// stored row so it matches what the next full read would return.
    pub async fn add_tag(&self, item_id: &str, tag_id: &str) -> Result<()> {
        self.repo.add_tag_to_item(item_id, tag_id).await?;
        self.refresh_cached_tags(item_id).await
    }

    pub async fn remove_tag(&self, item_id: &str, tag_id: &str) -> Result<()> {
        self.repo.remove_tag_from_item(item_id, tag_id).await?;
        self.refresh_cached_tags(item_id).await
    }

    async fn refresh_cached_tags(&self, item_id: &str) -> Result<()> {
        let item = self.repo.get_item(item_id).await?;
        self.store.set_tag_names_cached(item_id, item.tag_names);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUILTIN_CATEGORIES;
    use crate::database::models::{CaptureFields, CreateTagRequest};
    use crate::database::{initialize_database, Repository};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> ItemService {
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

        ItemService::new(repo, ItemStore::new())
    }

    fn capture(content: &str, timestamp: i64) -> CaptureFields {
        CaptureFields {
            content: content.to_string(),
            image_path: None,
            thumbnail_path: None,
            content_type: "text".to_string(),
            category: "text".to_string(),
            timestamp,
            source_app_name: None,
            source_app_icon: None,
            image_width: None,
            image_height: None,
            image_size: None,
            dominant_color: None,
        }
    }

    #[tokio::test]
    async fn test_pin_moves_item_in_cache_and_storage() {
        let service = create_test_service().await;

        let old = service.repo.merge_or_insert(&capture("old", 1)).await.unwrap();
        service.repo.merge_or_insert(&capture("new", 2)).await.unwrap();
        service.reload(HistoryLimit::Unlimited).await.unwrap();

        assert_eq!(service.store.items()[1].id, old.id);

        service.set_pinned(&old.id, true).await.unwrap();
        assert_eq!(service.store.items()[0].id, old.id);

        // Storage agrees after a fresh reload.
        service.reload(HistoryLimit::Unlimited).await.unwrap();
        assert_eq!(service.store.items()[0].id, old.id);
        assert!(service.store.items()[0].is_pinned);
    }

    #[tokio::test]
    async fn test_delete_removes_from_view_not_storage() {
        let service = create_test_service().await;

        let outcome = service.repo.merge_or_insert(&capture("gone", 1)).await.unwrap();
        service.reload(HistoryLimit::Unlimited).await.unwrap();

        service.delete_item(&outcome.id).await.unwrap();
        assert!(service.store.items().is_empty());

        // The row still exists, flagged deleted.
        let flag: i32 = sqlx::query_scalar("SELECT is_deleted FROM clipboard_items WHERE id = ?")
            .bind(&outcome.id)
            .fetch_one(service.repo.pool())
            .await
            .unwrap();
        assert_eq!(flag, 1);
    }

    #[tokio::test]
    async fn test_tag_assignment_refreshes_projection() {
        let service = create_test_service().await;

        let outcome = service.repo.merge_or_insert(&capture("tagme", 1)).await.unwrap();
        service.reload(HistoryLimit::Unlimited).await.unwrap();

        let tag = service
            .repo
            .create_tag(CreateTagRequest {
                name: "urgent".to_string(),
                icon: "flag".to_string(),
                color: "#f00".to_string(),
            })
            .await
            .unwrap();

        service.add_tag(&outcome.id, &tag.id).await.unwrap();
        let cached = service.store.get(&outcome.id).unwrap();
        assert_eq!(cached.tags(), vec!["urgent"]);

        service.remove_tag(&outcome.id, &tag.id).await.unwrap();
        let cached = service.store.get(&outcome.id).unwrap();
        assert!(cached.tags().is_empty());
    }
}
