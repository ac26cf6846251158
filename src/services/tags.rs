//! Tag catalog service
//!
//! Tags relate to items through a stable id, so a rename never touches
//! item rows; only the catalog row changes before the bus announcement.

use crate::config::DEFAULT_TAGS;
use crate::database::models::{CreateTagRequest, Tag};
use crate::database::Repository;
use crate::error::{AppError, Result};
use crate::services::events::{AppEvent, EventBus};
use crate::services::naming::{validate_name, CatalogKind};
use crate::services::now_ms;
use crate::services::store::ItemStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

/// Service for managing the tag catalog
#[derive(Clone)]
pub struct TagService {
    repo: Repository,
    store: Arc<ItemStore>,
    events: EventBus,
    catalog: Arc<RwLock<Vec<Tag>>>,
    /// Lower-cased names with a create currently in flight; same guard as
    /// the category catalog.
    creating: Arc<Mutex<HashSet<String>>>,
}

impl TagService {
    pub fn new(repo: Repository, store: Arc<ItemStore>, events: EventBus) -> Self {
        Self {
            repo,
            store,
            events,
            catalog: Arc::new(RwLock::new(Vec::new())),
            creating: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Seed the default tags (create-if-missing) and prime the cache.
    pub async fn ensure_defaults(&self) -> Result<()> {
        for (name, icon, color) in DEFAULT_TAGS {
            self.repo.ensure_default_tag(name, icon, color).await?;
        }

        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<()> {
        *self.catalog.write().unwrap() = self.repo.list_tags().await?;
        Ok(())
    }

    pub fn list(&self) -> Vec<Tag> {
        self.catalog.read().unwrap().clone()
    }

    pub async fn create(&self, name: &str, icon: &str, color: &str) -> Result<Tag> {
        let name = validate_name(CatalogKind::Tag, name)?;

        if self.repo.find_tag_by_name(&name).await?.is_some() {
            return Err(AppError::Validation(format!(
                "A tag named \"{}\" already exists",
                name
            )));
        }

        let guard_key = name.to_lowercase();
        {
            let mut creating = self.creating.lock().unwrap();
            if !creating.insert(guard_key.clone()) {
                return Err(AppError::Validation(format!(
                    "A tag named \"{}\" is already being created",
                    name
                )));
            }
        }

        let result = self
            .repo
            .create_tag(CreateTagRequest {
                name: name.clone(),
                icon: icon.to_string(),
                color: color.to_string(),
            })
            .await;

        // The guard must clear on the failure path too.
        self.creating.lock().unwrap().remove(&guard_key);

        let tag = result?;
        self.refresh().await?;

        tracing::info!("Created tag: {}", tag.name);
        Ok(tag)
    }

    /// Update a tag; a name change touches the catalog row only, then
    /// broadcasts.
    pub async fn update(&self, id: &str, name: &str, icon: &str, color: &str) -> Result<Tag> {
        let current = self.repo.get_tag(id).await?;
        let new_name = validate_name(CatalogKind::Tag, name)?;

        if new_name != current.name {
            if let Some(existing) = self.repo.find_tag_by_name(&new_name).await? {
                if existing.id != id {
                    return Err(AppError::Validation(format!(
                        "A tag named \"{}\" already exists",
                        new_name
                    )));
                }
            }
        }

        self.repo.rename_tag(id, &new_name, icon, color).await?;
        self.refresh().await?;

        if new_name != current.name {
            // The cached comma-joined projections still carry the old name.
            self.store.apply_tag_rename(&current.name, &new_name);

            self.events.broadcast(AppEvent::TagRenamed {
                tag_id: id.to_string(),
                old_name: current.name.clone(),
                new_name: new_name.clone(),
                at: now_ms(),
            });
            tracing::info!("Renamed tag {} -> {}", current.name, new_name);
        }

        self.cached(id)
    }

    /// Delete a custom tag; defaults are a warning no-op. Association
    /// rows are removed before the catalog row.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let current = self.repo.get_tag(id).await?;

        if current.is_default {
            tracing::warn!("Ignoring request to delete default tag: {}", current.name);
            return Ok(());
        }

        self.repo.delete_tag(id).await?;
        self.refresh().await?;

        tracing::info!("Deleted tag: {}", current.name);
        Ok(())
    }

    fn cached(&self, id: &str) -> Result<Tag> {
        self.catalog
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| AppError::TagNotFound(id.to_string()))
    }
}
