//! Error handling for the grid engine
//!
//! This module defines the crate-wide error type and a Result alias.
//! Fatal input errors (malformed row ids, duplicate schema fields) abort the
//! current pipeline run and are surfaced here; recoverable misconfigurations
//! (bad filter clauses, unknown aggregations) never reach this type — they
//! degrade in place and are logged once per distinct message.

use crate::pipeline::PipelineError;
use crate::types::RowKey;
use thiserror::Error;

/// Main error type for grid engine operations
#[derive(Error, Debug)]
pub enum GridError {
    /// Two input rows resolved to the same row id
    #[error("Duplicate row id `{0}`")]
    DuplicateRowId(RowKey),

    /// A row yielded no id through the configured id source
    #[error("Row at position {0} has no id")]
    MissingRowId(usize),

    /// Two column definitions share the same field
    #[error("Duplicate column field `{0}`")]
    DuplicateColumnField(String),

    /// The grouping model lists the same field twice
    #[error("Duplicate grouping field `{0}`")]
    DuplicateGroupingField(String),

    /// A pipeline processor failed; prior derived state is retained
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to state snapshot content
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO errors (snapshot persistence)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors (snapshot encode/decode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<GridError>,
    },
}

impl GridError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        GridError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for grid engine operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
