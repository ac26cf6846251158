//! Settings service
//!
//! Manages application settings persistence using JSON file storage.
//! Per-field serde defaults keep older settings files loadable after new
//! fields are added.

use crate::config::{DEFAULT_HISTORY_LIMIT, UNLIMITED_HISTORY};
use crate::database::repository::HistoryLimit;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

fn default_auto_start_monitoring() -> bool {
    true
}

fn default_history_limit() -> i32 {
    DEFAULT_HISTORY_LIMIT
}

fn default_save_images() -> bool {
    true
}

fn default_max_image_size_mb() -> i32 {
    10
}

fn default_sensitive_keywords() -> Vec<String> {
    vec!["password".to_string(), "secret".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    // General
    #[serde(default = "default_auto_start_monitoring")]
    pub auto_start_monitoring: bool,

    // Storage
    /// Number of items history reads return; -1 means unlimited.
    #[serde(default = "default_history_limit")]
    pub history_limit: i32,
    /// 0 means never auto-delete.
    #[serde(default)]
    pub auto_delete_days: i32,
    #[serde(default = "default_save_images")]
    pub save_images: bool,
    #[serde(default = "default_max_image_size_mb")]
    pub max_image_size_mb: i32,

    // Privacy
    /// Source applications whose captures are ignored.
    #[serde(default)]
    pub exclude_apps: Vec<String>,
    /// Captures containing any of these (case-insensitive) are ignored.
    #[serde(default = "default_sensitive_keywords")]
    pub sensitive_keywords: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_start_monitoring: default_auto_start_monitoring(),
            history_limit: default_history_limit(),
            auto_delete_days: 0,
            save_images: default_save_images(),
            max_image_size_mb: default_max_image_size_mb(),
            exclude_apps: vec![],
            sensitive_keywords: default_sensitive_keywords(),
        }
    }
}

impl AppSettings {
    /// Load settings from `settings.json` under the data directory, or
    /// defaults when no file exists yet.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::settings_path(data_dir);

        if !path.exists() {
            return Ok(AppSettings::default());
        }

        let contents = fs::read_to_string(&path).await?;
        let settings: AppSettings = serde_json::from_str(&contents)?;

        Ok(settings)
    }

    /// Persist settings as pretty-printed JSON.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::settings_path(data_dir);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).await?;

        tracing::debug!("Saved settings to {:?}", path);
        Ok(())
    }

    fn settings_path(data_dir: &Path) -> PathBuf {
        data_dir.join("settings.json")
    }

    /// The history limit as consumed by list queries.
    pub fn history_limit(&self) -> HistoryLimit {
        if self.history_limit == UNLIMITED_HISTORY {
            HistoryLimit::Unlimited
        } else {
            HistoryLimit::Limited(self.history_limit as i64)
        }
    }
}
