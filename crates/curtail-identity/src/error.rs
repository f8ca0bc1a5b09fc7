use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The underlying cipher or random source failed. Not retryable;
    /// fatal to the caller.
    #[error("token encryption failed: {0}")]
    Crypto(String),
}
