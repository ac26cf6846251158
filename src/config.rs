//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the engine.

// ===== Naming Limits =====

/// Maximum length for a category or tag name in characters.
pub const MAX_NAME_LENGTH: usize = 50;

/// Names that can never be used for a category, checked case-insensitively.
/// "all" is the category-filter sentinel and "unknown" is the presentation
/// fallback for orphaned items.
pub const RESERVED_CATEGORY_NAMES: &[&str] = &["all", "password", "passwords", "unknown"];

/// Names that can never be used for a tag, checked case-insensitively.
pub const RESERVED_TAG_NAMES: &[&str] = &["all", "password", "passwords", "untagged"];

// ===== Built-in Catalogs =====

/// Built-in categories seeded at startup: (name, icon, color, sort_order).
/// These are the auto-assignment targets of the content classifier and can
/// never be deleted or shadowed by a custom category.
pub const BUILTIN_CATEGORIES: &[(&str, &str, &str, i32)] = &[
    ("text", "file-text", "#64748b", 0),
    ("links", "link", "#3b82f6", 1),
    ("email", "mail", "#f59e0b", 2),
    ("code", "code", "#8b5cf6", 3),
    ("color", "palette", "#ec4899", 4),
    ("phone", "phone", "#10b981", 5),
    ("number", "hash", "#06b6d4", 6),
    ("image", "image", "#ef4444", 7),
];

/// Default tags seeded at startup: (name, icon, color).
pub const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("favorite", "star", "#f59e0b"),
    ("work", "briefcase", "#3b82f6"),
    ("personal", "user", "#10b981"),
    ("todo", "check-square", "#8b5cf6"),
];

// ===== Timer Windows =====

/// Inactivity window before the raw search query is committed to the
/// filter-relevant debounced query.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// How long a broadcast event stays readable on the bus before the slot
/// auto-clears.
pub const EVENT_PULSE_MS: u64 = 50;

/// Window after a drag ends during which the synthetic follow-up click is
/// swallowed.
pub const DRAG_CLICK_COOLDOWN_MS: u64 = 100;

// ===== Capture Filter Limits =====

/// Text captures shorter than this (after trimming) are ignored.
pub const MIN_CAPTURE_LENGTH: usize = 2;

// ===== Storage Defaults =====

/// Default number of items retained in history views.
pub const DEFAULT_HISTORY_LIMIT: i32 = 500;

/// Sentinel meaning "no history limit".
pub const UNLIMITED_HISTORY: i32 = -1;
