//! Name validation shared by the category and tag catalogs
//!
//! Catalog-state checks (collision with built-ins or existing rows) live
//! in the catalog services; this module owns the pure constraints.

use crate::config::{MAX_NAME_LENGTH, RESERVED_CATEGORY_NAMES, RESERVED_TAG_NAMES};
use crate::error::{AppError, Result};

/// Which catalog a name is destined for. The reserved-word lists differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Category,
    Tag,
}

impl CatalogKind {
    fn reserved_names(&self) -> &'static [&'static str] {
        match self {
            CatalogKind::Category => RESERVED_CATEGORY_NAMES,
            CatalogKind::Tag => RESERVED_TAG_NAMES,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CatalogKind::Category => "category",
            CatalogKind::Tag => "tag",
        }
    }
}

/// Validate a user-supplied catalog name and return its trimmed form.
///
/// Rejects empty/whitespace-only names, names over `MAX_NAME_LENGTH`
/// characters, and case-insensitive matches against the reserved list for
/// the kind.
pub fn validate_name(kind: CatalogKind, raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(format!(
            "{} name cannot be empty",
            kind.label()
        )));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "{} name cannot exceed {} characters",
            kind.label(),
            MAX_NAME_LENGTH
        )));
    }

    let lowered = trimmed.to_lowercase();
    if kind
        .reserved_names()
        .iter()
        .any(|reserved| *reserved == lowered)
    {
        return Err(AppError::Validation(format!(
            "\"{}\" is a reserved {} name",
            trimmed,
            kind.label()
        )));
    }

    Ok(trimmed.to_string())
}
