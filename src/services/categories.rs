//! Category catalog service
//!
//! Keeps the in-memory category catalog synced with storage and owns the
//! rename protocol: because items reference categories by *name*, a
//! rename must rewrite the catalog row, every referencing item, the
//! cached projection, and the presentation order, then announce itself on
//! the event bus.

use crate::config::BUILTIN_CATEGORIES;
use crate::database::models::{Category, CreateCategoryRequest};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::services::events::{AppEvent, EventBus};
use crate::services::naming::{validate_name, CatalogKind};
use crate::services::now_ms;
use crate::services::store::ItemStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

/// Service for managing the category catalog
#[derive(Clone)]
pub struct CategoryService {
    repo: Repository,
    store: Arc<ItemStore>,
    events: EventBus,
    catalog: Arc<RwLock<Vec<Category>>>,
    /// Presentation order of category names; a rename swaps the token in
    /// place instead of rebuilding.
    order: Arc<RwLock<Vec<String>>>,
    /// Lower-cased names with a create currently in flight. Entered before
    /// the write and removed on every exit path, so a double-click cannot
    /// insert two rows for the same intended name.
    creating: Arc<Mutex<HashSet<String>>>,
}

impl CategoryService {
    pub fn new(repo: Repository, store: Arc<ItemStore>, events: EventBus) -> Self {
        Self {
            repo,
            store,
            events,
            catalog: Arc::new(RwLock::new(Vec::new())),
            order: Arc::new(RwLock::new(Vec::new())),
            creating: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Seed the built-in categories (create-if-missing) and prime the
    /// cache. Safe to call on every startup.
    pub async fn ensure_builtins(&self) -> Result<()> {
        for (name, icon, color, sort_order) in BUILTIN_CATEGORIES {
            self.repo
                .ensure_builtin_category(name, icon, color, *sort_order)
                .await?;
        }

        self.refresh().await
    }

    /// Re-read the catalog from storage and rebuild the order list.
    pub async fn refresh(&self) -> Result<()> {
        let categories = self.repo.list_categories().await?;
        *self.order.write().unwrap() = categories.iter().map(|c| c.name.clone()).collect();
        *self.catalog.write().unwrap() = categories;
        Ok(())
    }

    pub fn list(&self) -> Vec<Category> {
        self.catalog.read().unwrap().clone()
    }

    pub fn order(&self) -> Vec<String> {
        self.order.read().unwrap().clone()
    }

    /// Create a custom category.
    pub async fn create(&self, name: &str, icon: &str, color: &str) -> Result<Category> {
        let name = validate_name(CatalogKind::Category, name)?;

        if self.repo.find_category_by_name(&name).await?.is_some() {
            return Err(AppError::Validation(format!(
                "A category named \"{}\" already exists",
                name
            )));
        }

        let guard_key = name.to_lowercase();
        {
            let mut creating = self.creating.lock().unwrap();
            if !creating.insert(guard_key.clone()) {
                return Err(AppError::Validation(format!(
                    "A category named \"{}\" is already being created",
                    name
                )));
            }
        }

        let sort_order = 100 + self.catalog.read().unwrap().len() as i32;
        let result = self
            .repo
            .create_category(
                CreateCategoryRequest {
                    name: name.clone(),
                    icon: icon.to_string(),
                    color: color.to_string(),
                },
                sort_order,
            )
            .await;

        // The guard must clear on the failure path too.
        self.creating.lock().unwrap().remove(&guard_key);

        let category = result?;
        self.refresh().await?;

        tracing::info!("Created category: {}", category.name);
        Ok(category)
    }

    /// Update a category; a name change cascades to every referencing
    /// item.
    ///
    /// The current name is resolved from storage by id, never taken from
    /// the caller: the UI may hold a stale copy of the catalog.
    pub async fn update(&self, id: &str, name: &str, icon: &str, color: &str) -> Result<Category> {
        let current = self.repo.get_category(id).await?;
        let new_name = validate_name(CatalogKind::Category, name)?;

        if new_name == current.name {
            // Metadata-only update: zero item writes.
            self.repo.update_category_metadata(id, icon, color).await?;
            self.refresh().await?;
            return self.cached(id);
        }

        if !current.is_custom {
            return Err(AppError::Validation(format!(
                "Built-in category \"{}\" cannot be renamed",
                current.name
            )));
        }

        if let Some(existing) = self.repo.find_category_by_name(&new_name).await? {
            if existing.id != id {
                return Err(AppError::Validation(format!(
                    "A category named \"{}\" already exists",
                    new_name
                )));
            }
        }

        let moved = self
            .repo
            .rename_category_cascade(id, &current.name, &new_name, icon, color)
            .await?;
        tracing::info!(
            "Category rename {} -> {} cascaded to {} items",
            current.name,
            new_name,
            moved
        );

        // Patch the cached projection and swap the order token, then let
        // any mounted surface know.
        self.store.apply_category_rename(&current.name, &new_name);
        {
            let mut order = self.order.write().unwrap();
            if let Some(slot) = order.iter_mut().find(|entry| **entry == current.name) {
                *slot = new_name.clone();
            }
        }
        self.refresh().await?;

        self.events.broadcast(AppEvent::CategoryRenamed {
            category_id: id.to_string(),
            old_name: current.name,
            new_name: new_name.clone(),
            at: now_ms(),
        });

        self.cached(id)
    }

    /// Delete a custom category. Built-ins are a warning no-op. Items
    /// referencing the deleted name are left orphaned on purpose.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let current = self.repo.get_category(id).await?;

        if !current.is_custom {
            tracing::warn!(
                "Ignoring request to delete built-in category: {}",
                current.name
            );
            return Ok(());
        }

        self.repo.delete_category(id).await?;
        self.order.write().unwrap().retain(|name| *name != current.name);
        self.refresh().await?;

        tracing::info!("Deleted category: {}", current.name);
        Ok(())
    }

    fn cached(&self, id: &str) -> Result<Category> {
        self.catalog
            .read()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))
    }
}
