//! Repository layer for database operations
//!
//! This module is the sole boundary between the engine and durable
//! storage: item merge/CRUD, category and tag catalogs, and the
//! rename-cascade protocol all live here.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// How many items a history read may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLimit {
    Limited(i64),
    Unlimited,
}

impl HistoryLimit {
    /// SQLite treats a negative LIMIT as "no limit".
    fn as_sql(&self) -> i64 {
        match self {
            HistoryLimit::Limited(n) => *n,
            HistoryLimit::Unlimited => -1,
        }
    }
}

const ITEM_COLUMNS: &str = "i.id, i.content, i.image_path, i.thumbnail_path, i.content_type, \
     i.category, i.is_pinned, i.is_deleted, i.timestamp, i.created_at, \
     i.source_app_name, i.source_app_icon, i.image_width, i.image_height, \
     i.image_size, i.dominant_color";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Clipboard items =====

    /// Find-by-identity-or-create.
    ///
    /// The identity key is the image path for image captures and the
    /// content string otherwise, matched against non-deleted rows only.
    /// An existing row is bumped (timestamp, content_type, category); a
    /// missing one is inserted. Runs in a transaction so the lookup and
    /// the write observe the same state.
    pub async fn merge_or_insert(&self, fields: &CaptureFields) -> Result<MergeOutcome> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = match &fields.image_path {
            Some(path) => {
                sqlx::query_scalar(
                    "SELECT id FROM clipboard_items WHERE is_deleted = 0 AND image_path = ?",
                )
                .bind(path)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT id FROM clipboard_items WHERE is_deleted = 0 AND image_path IS NULL AND content = ?",
                )
                .bind(&fields.content)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        let outcome = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE clipboard_items SET timestamp = ?, content_type = ?, category = ? WHERE id = ?",
                )
                .bind(fields.timestamp)
                .bind(&fields.content_type)
                .bind(&fields.category)
                .bind(&id)
                .execute(&mut *tx)
                .await?;

                tracing::debug!("Bumped clipboard item: {}", id);
                MergeOutcome { id, is_new: false }
            }
            None => {
                let id = Uuid::new_v4().to_string();

                sqlx::query(
                    r#"
                    INSERT INTO clipboard_items (
                        id, content, image_path, thumbnail_path, content_type, category,
                        is_pinned, is_deleted, timestamp, created_at,
                        source_app_name, source_app_icon,
                        image_width, image_height, image_size, dominant_color
                    )
                    VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(&fields.content)
                .bind(&fields.image_path)
                .bind(&fields.thumbnail_path)
                .bind(&fields.content_type)
                .bind(&fields.category)
                .bind(fields.timestamp)
                .bind(fields.timestamp)
                .bind(&fields.source_app_name)
                .bind(&fields.source_app_icon)
                .bind(fields.image_width)
                .bind(fields.image_height)
                .bind(fields.image_size)
                .bind(&fields.dominant_color)
                .execute(&mut *tx)
                .await?;

                tracing::debug!("Inserted clipboard item: {}", id);
                MergeOutcome { id, is_new: true }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Get a single item with its tag-name projection.
    pub async fn get_item(&self, id: &str) -> Result<ClipboardItem> {
        let item = sqlx::query_as::<_, ClipboardItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}, GROUP_CONCAT(t.name) AS tag_names
            FROM clipboard_items i
            LEFT JOIN item_tags it ON it.item_id = i.id
            LEFT JOIN tags t ON t.id = it.tag_id
            WHERE i.id = ? AND i.is_deleted = 0
            GROUP BY i.id
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ItemNotFound(id.to_string()))?;

        Ok(item)
    }

    /// List non-deleted items in canonical order: pinned first, then
    /// last-activity descending, id descending as the stable tie-break.
    pub async fn list_items(
        &self,
        limit: HistoryLimit,
        category: Option<&str>,
    ) -> Result<Vec<ClipboardItem>> {
        let items = match category {
            Some(name) => {
                sqlx::query_as::<_, ClipboardItem>(&format!(
                    r#"
                    SELECT {ITEM_COLUMNS}, GROUP_CONCAT(t.name) AS tag_names
                    FROM clipboard_items i
                    LEFT JOIN item_tags it ON it.item_id = i.id
                    LEFT JOIN tags t ON t.id = it.tag_id
                    WHERE i.is_deleted = 0 AND i.category = ?
                    GROUP BY i.id
                    ORDER BY i.is_pinned DESC, i.timestamp DESC, i.id DESC
                    LIMIT ?
                    "#
                ))
                .bind(name)
                .bind(limit.as_sql())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ClipboardItem>(&format!(
                    r#"
                    SELECT {ITEM_COLUMNS}, GROUP_CONCAT(t.name) AS tag_names
                    FROM clipboard_items i
                    LEFT JOIN item_tags it ON it.item_id = i.id
                    LEFT JOIN tags t ON t.id = it.tag_id
                    WHERE i.is_deleted = 0
                    GROUP BY i.id
                    ORDER BY i.is_pinned DESC, i.timestamp DESC, i.id DESC
                    LIMIT ?
                    "#
                ))
                .bind(limit.as_sql())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(items)
    }

    /// Soft delete an item. The row is retained but excluded from every
    /// read path, including duplicate detection.
    pub async fn soft_delete(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE clipboard_items SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(id.to_string()));
        }

        tracing::debug!("Soft deleted item: {}", id);
        Ok(())
    }

    pub async fn set_pinned(&self, id: &str, pinned: bool) -> Result<()> {
        let rows = sqlx::query("UPDATE clipboard_items SET is_pinned = ? WHERE id = ? AND is_deleted = 0")
            .bind(pinned)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(id.to_string()));
        }

        tracing::debug!("Set pinned = {} on item: {}", pinned, id);
        Ok(())
    }

    pub async fn set_item_category(&self, id: &str, category: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE clipboard_items SET category = ? WHERE id = ? AND is_deleted = 0")
            .bind(category)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(id.to_string()));
        }

        tracing::debug!("Moved item {} to category {}", id, category);
        Ok(())
    }

    // ===== Categories =====

    /// Seed a built-in category if it is missing. Idempotent.
    pub async fn ensure_builtin_category(
        &self,
        name: &str,
        icon: &str,
        color: &str,
        sort_order: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, icon, color, is_custom, sort_order, created_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(icon)
        .bind(color)
        .bind(sort_order)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_category(&self, req: CreateCategoryRequest, sort_order: i32) -> Result<Category> {
        let id = Uuid::new_v4().to_string();

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, name, icon, color, is_custom, sort_order, created_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.icon)
        .bind(&req.color)
        .bind(sort_order)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created category: {} ({})", category.name, id);
        Ok(category)
    }

    pub async fn get_category(&self, id: &str) -> Result<Category> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))
    }

    /// Case-insensitive lookup used by collision checks.
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = ? COLLATE NOCASE")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }

    /// Built-ins first by their fixed order, then customs alphabetically.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY is_custom ASC, sort_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Metadata-only update: icon and color change, the name does not, so
    /// no item rows are touched.
    pub async fn update_category_metadata(&self, id: &str, icon: &str, color: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE categories SET icon = ?, color = ? WHERE id = ?")
            .bind(icon)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::CategoryNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Rename a category and rewrite every item that references the old
    /// name.
    ///
    /// The item table references `categories(name)`, so the two writes
    /// cannot both satisfy the constraint mid-flight. Enforcement is
    /// relaxed on this one connection for the duration and restored
    /// unconditionally afterward. There is no enclosing transaction and
    /// no compensating rollback: if the item rewrite fails after the
    /// catalog write, storage is left inconsistent and the error is
    /// surfaced.
    ///
    /// Returns the number of item rows rewritten.
    pub async fn rename_category_cascade(
        &self,
        id: &str,
        old_name: &str,
        new_name: &str,
        icon: &str,
        color: &str,
    ) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let outcome =
            Self::run_rename_writes(&mut conn, id, old_name, new_name, icon, color).await;

        // Restore enforcement whether or not the writes succeeded; the
        // connection returns to the pool, so leaving it relaxed would
        // disable checks for unrelated operations.
        let restore = sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await;

        let moved = outcome?;
        restore?;

        tracing::info!(
            "Renamed category {} -> {} ({} items updated)",
            old_name,
            new_name,
            moved
        );
        Ok(moved)
    }

    async fn run_rename_writes(
        conn: &mut SqliteConnection,
        id: &str,
        old_name: &str,
        new_name: &str,
        icon: &str,
        color: &str,
    ) -> Result<u64> {
        let rows = sqlx::query("UPDATE categories SET name = ?, icon = ?, color = ? WHERE id = ?")
            .bind(new_name)
            .bind(icon)
            .bind(color)
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::CategoryNotFound(id.to_string()));
        }

        let moved = sqlx::query("UPDATE clipboard_items SET category = ? WHERE category = ?")
            .bind(new_name)
            .bind(old_name)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        Ok(moved)
    }

    /// Delete a category row, leaving items that reference it orphaned.
    ///
    /// Items keep the stale name on purpose; the host presents them under
    /// an "unknown category" fallback. The name FK is relaxed the same way
    /// the rename cascade relaxes it, since the children outlive the
    /// parent row.
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let outcome = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await;

        let restore = sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await;

        let result = outcome?;
        restore?;

        if result.rows_affected() == 0 {
            return Err(AppError::CategoryNotFound(id.to_string()));
        }

        tracing::debug!("Deleted category: {}", id);
        Ok(())
    }

    // ===== Tags =====

    /// Seed a default tag if it is missing. Idempotent.
    pub async fn ensure_default_tag(&self, name: &str, icon: &str, color: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tags (id, name, icon, color, is_default, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(icon)
        .bind(color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_tag(&self, req: CreateTagRequest) -> Result<Tag> {
        let id = Uuid::new_v4().to_string();

        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, name, icon, color, is_default, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.icon)
        .bind(&req.color)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created tag: {} ({})", tag.name, id);
        Ok(tag)
    }

    pub async fn get_tag(&self, id: &str) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::TagNotFound(id.to_string()))
    }

    pub async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ? COLLATE NOCASE")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags =
            sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY is_default DESC, name ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(tags)
    }

    /// Tags relate to items through a stable id, so a rename touches the
    /// catalog row only.
    pub async fn rename_tag(&self, id: &str, new_name: &str, icon: &str, color: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE tags SET name = ?, icon = ?, color = ? WHERE id = ?")
            .bind(new_name)
            .bind(icon)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TagNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Association rows must go before the tag row itself.
    pub async fn delete_tag(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM item_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TagNotFound(id.to_string()));
        }

        tx.commit().await?;

        tracing::debug!("Deleted tag: {}", id);
        Ok(())
    }

    pub async fn add_tag_to_item(&self, item_id: &str, tag_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO item_tags (item_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_tag_from_item(&self, item_id: &str, tag_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?")
            .bind(item_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
