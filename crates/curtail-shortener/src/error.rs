use curtail_core::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenError {
    /// Caller supplied an empty URL, user ID, or key. User error; the
    /// boundary layer maps this to a 4xx response.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    /// Uniqueness conflict from the backend. For single creates the
    /// service absorbs this into the result; batch creates surface it
    /// for the whole call.
    #[error("duplicate key: {0}")]
    Duplicate(String),
    /// No live mapping: never existed, or soft-deleted ("gone").
    #[error("no live mapping for: {0}")]
    NotFound(String),
    /// Transport or backend failure, wrapped with context.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

/// Converts a StoreError, keeping the business-meaning variants typed.
pub(crate) fn store_to_shorten_error(e: StoreError) -> ShortenError {
    match e {
        StoreError::Duplicate(key) => ShortenError::Duplicate(key),
        StoreError::NotFound(key) => ShortenError::NotFound(key),
        other => ShortenError::Storage(other),
    }
}
