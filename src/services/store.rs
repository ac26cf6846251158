//! In-memory item projection
//!
//! The store mirrors persisted items in canonical order and derives the
//! filtered view the host renders. Mutations bump a watch revision so
//! independently-mounted surfaces can re-read without polling.
//!
//! Canonical order: pinned first, then last-activity descending, id
//! descending as the stable tie-break — the same law the repository's
//! list query applies.

use crate::config::SEARCH_DEBOUNCE_MS;
use crate::database::models::ClipboardItem;
use crate::services::timing::Debouncer;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;

/// Selected-category dimension; `All` is the no-filter sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

/// Filter dimensions composed with logical AND; the tag allow-list is OR
/// within its own dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilters {
    pub category: CategoryFilter,
    /// `Some(true)` = pinned only, `Some(false)` = unpinned only.
    pub pinned: Option<bool>,
    pub content_types: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    /// Inclusive bounds over first-capture time, epoch ms.
    pub date_range: Option<(i64, i64)>,
}

struct StoreState {
    items: Vec<ClipboardItem>,
    filters: ItemFilters,
    /// Echoed immediately for input widgets.
    raw_query: String,
    /// The filter-relevant query; follows `raw_query` after the debounce
    /// window.
    query: String,
}

pub struct ItemStore {
    state: RwLock<StoreState>,
    revision: watch::Sender<u64>,
    query_debouncer: Debouncer,
}

impl ItemStore {
    pub fn new() -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            state: RwLock::new(StoreState {
                items: Vec::new(),
                filters: ItemFilters::default(),
                raw_query: String::new(),
                query: String::new(),
            }),
            revision,
            query_debouncer: Debouncer::new(Duration::from_millis(SEARCH_DEBOUNCE_MS)),
        })
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Watch for store mutations; the value is an opaque revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn sort_canonical(items: &mut [ClipboardItem]) {
        items.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then(b.timestamp.cmp(&a.timestamp))
                .then(b.id.cmp(&a.id))
        });
    }

    // ===== Base-state mutations =====

    /// Full reload: replace the cache with freshly listed rows.
    pub fn replace(&self, mut items: Vec<ClipboardItem>) {
        Self::sort_canonical(&mut items);
        self.state.write().unwrap().items = items;
        self.bump_revision();
    }

    /// In-place bump of a cached item after a duplicate capture, followed
    /// by a re-sort. Skips the storage round trip a full reload would pay.
    pub fn patch(&self, id: &str, timestamp: i64, content_type: &str, category: &str) {
        let mut state = self.state.write().unwrap();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
            item.timestamp = timestamp;
            item.content_type = content_type.to_string();
            item.category = category.to_string();
        }
        Self::sort_canonical(&mut state.items);
        drop(state);
        self.bump_revision();
    }

    pub fn set_pinned_cached(&self, id: &str, pinned: bool) {
        let mut state = self.state.write().unwrap();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
            item.is_pinned = pinned;
        }
        Self::sort_canonical(&mut state.items);
        drop(state);
        self.bump_revision();
    }

    pub fn set_category_cached(&self, id: &str, category: &str) {
        let mut state = self.state.write().unwrap();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
            item.category = category.to_string();
        }
        drop(state);
        self.bump_revision();
    }

    pub fn set_tag_names_cached(&self, id: &str, tag_names: Option<String>) {
        let mut state = self.state.write().unwrap();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == id) {
            item.tag_names = tag_names;
        }
        drop(state);
        self.bump_revision();
    }

    pub fn remove(&self, id: &str) {
        self.state.write().unwrap().items.retain(|item| item.id != id);
        self.bump_revision();
    }

    /// Rewrite cached category strings after a rename cascade.
    pub fn apply_category_rename(&self, old_name: &str, new_name: &str) {
        let mut state = self.state.write().unwrap();
        for item in state.items.iter_mut().filter(|item| item.category == old_name) {
            item.category = new_name.to_string();
        }
        drop(state);
        self.bump_revision();
    }

    /// Rewrite cached tag-name projections after a tag rename. Storage is
    /// untouched (associations follow the stable tag id); only the cached
    /// comma-joined strings carry the old name.
    pub fn apply_tag_rename(&self, old_name: &str, new_name: &str) {
        let mut state = self.state.write().unwrap();
        for item in state.items.iter_mut() {
            if let Some(names) = &item.tag_names {
                if names.split(',').any(|name| name == old_name) {
                    let renamed: Vec<&str> = names
                        .split(',')
                        .map(|name| if name == old_name { new_name } else { name })
                        .collect();
                    item.tag_names = Some(renamed.join(","));
                }
            }
        }
        drop(state);
        self.bump_revision();
    }

    // ===== Filter state =====

    pub fn set_filters(&self, filters: ItemFilters) {
        self.state.write().unwrap().filters = filters;
        self.bump_revision();
    }

    pub fn filters(&self) -> ItemFilters {
        self.state.read().unwrap().filters.clone()
    }

    /// Update the search query. The raw value is readable immediately;
    /// the filter-relevant value commits only after the debounce window,
    /// and each keystroke restarts the timer.
    pub fn set_query(self: &Arc<Self>, raw: &str) {
        {
            let mut state = self.state.write().unwrap();
            state.raw_query = raw.to_string();
        }
        self.bump_revision();

        let store = Arc::clone(self);
        let committed = raw.to_string();
        self.query_debouncer.schedule(move || {
            store.commit_query(committed);
        });
    }

    fn commit_query(&self, query: String) {
        self.state.write().unwrap().query = query;
        self.bump_revision();
    }

    pub fn raw_query(&self) -> String {
        self.state.read().unwrap().raw_query.clone()
    }

    pub fn debounced_query(&self) -> String {
        self.state.read().unwrap().query.clone()
    }

    // ===== Derivations =====

    pub fn items(&self) -> Vec<ClipboardItem> {
        self.state.read().unwrap().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<ClipboardItem> {
        self.state
            .read()
            .unwrap()
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    /// Pure derivation of the filtered view over the cached items.
    pub fn filtered_items(&self) -> Vec<ClipboardItem> {
        let state = self.state.read().unwrap();
        let query = state.query.to_lowercase();

        state
            .items
            .iter()
            .filter(|item| Self::matches(item, &state.filters, &query))
            .cloned()
            .collect()
    }

    fn matches(item: &ClipboardItem, filters: &ItemFilters, query: &str) -> bool {
        if let CategoryFilter::Named(name) = &filters.category {
            if &item.category != name {
                return false;
            }
        }

        if let Some(pinned) = filters.pinned {
            if item.is_pinned != pinned {
                return false;
            }
        }

        if let Some(types) = &filters.content_types {
            if !types.iter().any(|t| t == &item.content_type) {
                return false;
            }
        }

        if let Some(categories) = &filters.categories {
            if !categories.iter().any(|c| c == &item.category) {
                return false;
            }
        }

        // OR within the tag dimension: one shared tag is enough.
        if let Some(tags) = &filters.tags {
            let item_tags = item.tags();
            if !tags.iter().any(|t| item_tags.contains(&t.as_str())) {
                return false;
            }
        }

        if let Some((from, to)) = filters.date_range {
            if item.created_at < from || item.created_at > to {
                return false;
            }
        }

        if !query.is_empty() {
            let haystacks = [
                item.content.to_lowercase(),
                item.source_app_name.clone().unwrap_or_default().to_lowercase(),
                item.category.to_lowercase(),
                item.content_type.to_lowercase(),
            ];
            if !haystacks.iter().any(|h| h.contains(query)) {
                return false;
            }
        }

        true
    }
}
