use crate::error::StoreError;
use crate::mapping::{BatchEntry, OwnedMapping};
use crate::short_key::ShortKey;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, StoreError>;

/// The owned-mapping store: insert, list, and resolve per user.
///
/// Implementations are shared behind `Arc` across request handlers and
/// must be safe for concurrent use. Cancellation follows the future:
/// dropping a call aborts the in-flight operation.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Inserts one mapping owned by `user_id`.
    /// Returns `Err(Duplicate)` on a uniqueness conflict.
    async fn save(&self, user_id: &str, original_url: &str, short_key: &ShortKey) -> Result<()>;

    /// Inserts a batch of mappings in one round trip. A duplicate
    /// anywhere in the batch surfaces as `Err(Duplicate)` for the
    /// whole call; partial application is at the backend's discretion.
    async fn save_batch(&self, user_id: &str, entries: &[BatchEntry]) -> Result<()>;

    /// Returns all live mappings owned by `user_id`; an empty vec
    /// (not an error) when there are none.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<OwnedMapping>>;

    /// Resolves a short key to its original URL, excluding
    /// soft-deleted rows. Scoped to `user_id` when non-empty,
    /// resolved globally otherwise. `Err(NotFound)` when no live row
    /// matches.
    async fn find_by_short(&self, user_id: &str, short_key: &str) -> Result<String>;

    /// Liveness probe for health checks.
    async fn ping(&self) -> bool;
}

/// The soft-delete side of the store, consumed by the deletion
/// pipeline's workers.
#[async_trait]
pub trait DeleteStore: Send + Sync + 'static {
    /// Flips `is_deleted` on the rows owned by `user_id` whose key is
    /// in `short_keys`. Missing or already-deleted rows are a no-op,
    /// so replaying a job is harmless.
    async fn soft_delete_batch(&self, user_id: &str, short_keys: &[String]) -> Result<()>;
}
