//! Service layer
//!
//! High-level business logic built on top of the repository: capture
//! ingestion, item/category/tag stores, event bus, and settings.

pub mod categories;
pub mod events;
pub mod ingest;
pub mod items;
pub mod naming;
pub mod settings;
pub mod store;
pub mod tags;
pub mod timing;

pub use categories::CategoryService;
pub use events::{AppEvent, EventBus};
pub use ingest::{CaptureEvent, IngestService};
pub use items::ItemService;
pub use settings::AppSettings;
pub use store::{CategoryFilter, ItemFilters, ItemStore};
pub use tags::TagService;
pub use timing::{CooldownGate, Debouncer};

/// Current instant as epoch milliseconds, the unit capture events carry.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
