//! Error types for the clipvault engine
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the host shell.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
