//! Error types for the library API.

use llm::error::LLMError;
use thiserror::Error;

/// Errors related to a prompt store (file access, serialization, etc.).
#[derive(Error, Debug)]
pub enum StoreError {
    /// An error occurred during store initialization.
    #[error("Failed to initialize store: {0}")]
    Init(String),

    /// The requested prompt could not be found by its ID or title.
    #[error("Prompt '{0}' not found")]
    NotFound(String),

    /// A given title matches multiple prompts.
    #[error("Title '{0}' is ambiguous (multiple matches found)")]
    AmbiguousTitle(String),

    /// The API was used with an invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An underlying file I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize data.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from category management.
#[derive(Error, Debug)]
pub enum CategoryError {
    /// The category name is already taken, either built-in or custom.
    #[error("Category '{0}' already exists")]
    AlreadyExists(String),

    /// Category names may not be blank.
    #[error("Category name cannot be empty")]
    Empty,
}

/// A comprehensive error type for test-run operations in the library API.
#[derive(Error, Debug)]
pub enum RunError {
    /// An error originating from the prompt store itself.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An error originating from the underlying LLM backend.
    #[error("LLM backend error: {0}")]
    LLM(#[from] LLMError),

    /// An error reported by a custom completion backend.
    #[error("Completion backend error: {0}")]
    Backend(String),

    /// The run was cancelled before the backend finished, usually because
    /// a newer run superseded it.
    #[error("Run cancelled")]
    Cancelled,
}
