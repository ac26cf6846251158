//! clipvault
//!
//! Clipboard-history engine: turns raw capture notifications into durable,
//! deduplicated, ordered records and keeps the item, category, and tag
//! projections a host shell renders consistent under concurrent edits.
//! The crate has no process surface of its own; a host mounts it through
//! [`app::AppState`].

pub mod app;
pub mod config;
pub mod content_type;
pub mod database;
pub mod error;
pub mod services;
