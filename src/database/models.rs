//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the host shell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single clipboard history entry.
///
/// `content` and `image_path` are mutually exclusive identity keys: text
/// items are identified by their content string, image items by the path
/// of the out-of-band asset the capture collaborator saved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClipboardItem {
    pub id: String,
    pub content: String,
    pub image_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub content_type: String,
    /// Category *name*, not id. Renaming a category rewrites this field on
    /// every item that references the old name.
    pub category: String,
    pub is_pinned: bool,
    pub is_deleted: bool,
    /// Last-activity epoch ms; bumped when the same content is re-copied.
    pub timestamp: i64,
    /// First-capture epoch ms; never changes after insert.
    pub created_at: i64,
    pub source_app_name: Option<String>,
    pub source_app_icon: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_size: Option<i64>,
    pub dominant_color: Option<String>,
    /// Comma-joined tag names, produced by the list query. Read-only.
    #[sqlx(default)]
    pub tag_names: Option<String>,
}

impl ClipboardItem {
    /// The duplicate-detection key: image path for images, content
    /// otherwise.
    pub fn identity(&self) -> &str {
        match &self.image_path {
            Some(path) => path,
            None => &self.content,
        }
    }

    /// Tag names as a list; empty when the item has no tags.
    pub fn tags(&self) -> Vec<&str> {
        match &self.tag_names {
            Some(names) if !names.is_empty() => names.split(',').collect(),
            _ => Vec::new(),
        }
    }
}

/// A category catalog entry. Items reference categories by name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_custom: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A tag catalog entry. Items reference tags by id through `item_tags`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields persisted by `Repository::merge_or_insert` for a capture.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureFields {
    pub content: String,
    pub image_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub content_type: String,
    pub category: String,
    pub timestamp: i64,
    pub source_app_name: Option<String>,
    pub source_app_icon: Option<String>,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
    pub image_size: Option<i64>,
    pub dominant_color: Option<String>,
}

/// Result of the merge-or-insert operation.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub id: String,
    /// True when a new row was inserted; false when an existing row was
    /// bumped.
    pub is_new: bool,
}

/// Create category request
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// Create tag request
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub icon: String,
    pub color: String,
}
