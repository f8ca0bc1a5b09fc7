use crate::short_key::ShortKey;
use serde::{Deserialize, Serialize};

/// One stored (user, original URL, short key) fact, as returned by
/// ownership listing.
///
/// `is_deleted` rows never leave the store, so the flag is not part of
/// this view; `id` is the store's surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedMapping {
    pub id: i64,
    pub user_id: String,
    pub original_url: String,
    pub short_key: String,
}

/// One element of a batched save, correlated back to the caller's
/// request by `correlation_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub correlation_id: String,
    pub original_url: String,
    pub short_key: ShortKey,
}
