use std::sync::Arc;

use curtail_core::{codec, BatchEntry, ShortKey, UserStore};
use curtail_storage::FileLog;
use serde::{Deserialize, Serialize};

use crate::error::{store_to_shorten_error, ShortenError};

type Result<T> = std::result::Result<T, ShortenError>;

/// Outcome of a create: the externally addressable short URL and
/// whether the mapping already existed. Deterministic encoding means a
/// duplicate is the same value the caller would have gotten, so the
/// URL is returned either way and the flag only drives the response
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub short_url: String,
    pub key: ShortKey,
    pub deduplicated: bool,
}

/// One element of a batch create request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One element of a batch create response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchCreated {
    pub correlation_id: String,
    pub short_url: String,
}

/// One mapping in a user's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLink {
    pub short_url: String,
    pub original_url: String,
}

/// Orchestrates the codec and the dual backends.
///
/// Creates write the file log first and the relational store second,
/// as two independent writes: a crash in between leaves the backends
/// inconsistent until the next file-log compaction, and the relational
/// store stays authoritative for resolution. This window is accepted;
/// do not wrap the two writes in anything resembling a transaction.
#[derive(Clone)]
pub struct ShortenService<S> {
    store: Arc<S>,
    file_log: Arc<FileLog>,
    base_url: String,
}

impl<S: UserStore> ShortenService<S> {
    pub fn new(store: Arc<S>, file_log: Arc<FileLog>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            file_log,
            base_url: base_url.into(),
        }
    }

    /// Creates (or re-finds) the mapping for `original_url` under
    /// `user_id` and returns its short URL.
    pub async fn create(&self, user_id: &str, original_url: &str) -> Result<Created> {
        if original_url.is_empty() {
            return Err(ShortenError::EmptyInput("original URL"));
        }

        let key = codec::encode(original_url);

        self.file_log
            .save(key.as_str(), original_url)
            .map_err(store_to_shorten_error)?;

        let deduplicated = match self.store.save(user_id, original_url, &key).await {
            Ok(()) => false,
            Err(e) if e.is_duplicate() => true,
            Err(e) => return Err(store_to_shorten_error(e)),
        };

        Ok(Created {
            short_url: key.to_url(&self.base_url),
            key,
            deduplicated,
        })
    }

    /// Batch create: per-item encoding and file-log writes, one
    /// relational round trip. There is no per-item failure isolation: any
    /// backend failure, duplicates included, fails the whole call.
    pub async fn create_batch(
        &self,
        user_id: &str,
        items: Vec<BatchRequestItem>,
    ) -> Result<Vec<BatchCreated>> {
        let mut entries = Vec::with_capacity(items.len());
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            if item.original_url.is_empty() {
                return Err(ShortenError::EmptyInput("original URL"));
            }
            let key = codec::encode(&item.original_url);

            self.file_log
                .save(key.as_str(), &item.original_url)
                .map_err(store_to_shorten_error)?;

            results.push(BatchCreated {
                correlation_id: item.correlation_id.clone(),
                short_url: key.to_url(&self.base_url),
            });
            entries.push(BatchEntry {
                correlation_id: item.correlation_id,
                original_url: item.original_url,
                short_key: key,
            });
        }

        self.store
            .save_batch(user_id, &entries)
            .await
            .map_err(store_to_shorten_error)?;

        Ok(results)
    }

    /// Lists all live mappings owned by `user_id`.
    ///
    /// The identity layer guarantees a non-empty ID in practice; the
    /// guard is a defensive invariant, not a reachable path.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserLink>> {
        if user_id.is_empty() {
            return Err(ShortenError::EmptyInput("user ID"));
        }

        let mappings = self
            .store
            .find_by_user(user_id)
            .await
            .map_err(store_to_shorten_error)?;

        Ok(mappings
            .into_iter()
            .map(|m| UserLink {
                short_url: ShortKey::new_unchecked(&m.short_key).to_url(&self.base_url),
                original_url: m.original_url,
            })
            .collect())
    }

    /// Resolves a short key to its original URL. An empty `user_id`
    /// resolves globally (public redirect links); a non-empty one
    /// restricts the lookup to that owner.
    pub async fn resolve(&self, user_id: &str, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(ShortenError::EmptyInput("short key"));
        }

        self.store
            .find_by_short(user_id, key)
            .await
            .map_err(store_to_shorten_error)
    }

    /// Liveness of the authoritative backend, for health checks.
    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }
}
