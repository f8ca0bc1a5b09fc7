use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use curtail_core::{BatchEntry, DeleteStore, OwnedMapping, ShortKey, StoreError, UserStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    user_id: String,
    original_url: String,
    is_deleted: bool,
}

/// In-memory implementation of the store traits, keyed by short key.
///
/// Mirrors the relational semantics exactly: global key uniqueness
/// (soft-deleted rows still occupy their key), soft delete as a flag
/// flip, idempotent re-deletion. DashMap's sharded locks make it safe
/// for the same concurrent use as the real store, which is what the
/// pipeline and service tests exercise.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: DashMap<String, Row>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn insert_row(&self, user_id: &str, original_url: &str, short_key: &str) -> Result<()> {
        match self.rows.entry(short_key.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(short_key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Row {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    user_id: user_id.to_string(),
                    original_url: original_url.to_string(),
                    is_deleted: false,
                });
                Ok(())
            }
        }
    }

    /// Test hook: whether the row for `short_key` is soft-deleted.
    pub fn is_deleted(&self, short_key: &str) -> Option<bool> {
        self.rows.get(short_key).map(|row| row.is_deleted)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn save(&self, user_id: &str, original_url: &str, short_key: &ShortKey) -> Result<()> {
        self.insert_row(user_id, original_url, short_key.as_str())
    }

    async fn save_batch(&self, user_id: &str, entries: &[BatchEntry]) -> Result<()> {
        // No partial application: reject the whole batch up front if
        // any key is taken, matching the transactional backend.
        for entry in entries {
            if self.rows.contains_key(entry.short_key.as_str()) {
                return Err(StoreError::Duplicate(entry.short_key.to_string()));
            }
        }
        for entry in entries {
            self.insert_row(user_id, &entry.original_url, entry.short_key.as_str())?;
        }
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<OwnedMapping>> {
        let mut mappings: Vec<OwnedMapping> = self
            .rows
            .iter()
            .filter(|entry| entry.user_id == user_id && !entry.is_deleted)
            .map(|entry| OwnedMapping {
                id: entry.id,
                user_id: entry.user_id.clone(),
                original_url: entry.original_url.clone(),
                short_key: entry.key().clone(),
            })
            .collect();
        mappings.sort_by_key(|m| m.id);
        Ok(mappings)
    }

    async fn find_by_short(&self, user_id: &str, short_key: &str) -> Result<String> {
        let Some(row) = self.rows.get(short_key) else {
            return Err(StoreError::NotFound(short_key.to_string()));
        };

        if row.is_deleted || (!user_id.is_empty() && row.user_id != user_id) {
            return Err(StoreError::NotFound(short_key.to_string()));
        }

        Ok(row.original_url.clone())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[async_trait]
impl DeleteStore for InMemoryStore {
    async fn soft_delete_batch(&self, user_id: &str, short_keys: &[String]) -> Result<()> {
        for key in short_keys {
            if let Some(mut row) = self.rows.get_mut(key) {
                if row.user_id == user_id {
                    row.is_deleted = true;
                }
            }
        }
        Ok(())
    }
}
