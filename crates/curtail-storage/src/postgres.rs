use async_trait::async_trait;
use curtail_core::{BatchEntry, DeleteStore, OwnedMapping, ShortKey, StoreError, UserStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::warn;

type Result<T> = std::result::Result<T, StoreError>;

/// PostgreSQL implementation of the owned-mapping store.
///
/// Each mapping is a row in `mappings` plus an ownership row in
/// `user_mappings`; deletes only flip `is_deleted`, keeping the row
/// for audit. All reads exclude soft-deleted rows through the join.
/// Uniqueness conflicts surface as [`StoreError::Duplicate`] so that
/// callers can implement idempotent-create semantics instead of
/// string-matching error text.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const INSERT_MAPPING: &str = r#"
    WITH mapping AS (
        INSERT INTO mappings (correlation_id, original_url, short_key)
        VALUES ($2, $3, $4)
        RETURNING id
    )
    INSERT INTO user_mappings (mapping_id, user_id)
    SELECT id, $1 FROM mapping
"#;

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the schema if it does not exist yet (the re-init path
    /// of deployments that own their database).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../ddl/postgres/schema.sql"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn save(&self, user_id: &str, original_url: &str, short_key: &ShortKey) -> Result<()> {
        let result = sqlx::query(INSERT_MAPPING)
            .bind(user_id)
            .bind(Option::<&str>::None)
            .bind(original_url)
            .bind(short_key.as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Duplicate(short_key.to_string()))
            }
            Err(e) => Err(map_sqlx_error(e)),
        }
    }

    async fn save_batch(&self, user_id: &str, entries: &[BatchEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for entry in entries {
            let result = sqlx::query(INSERT_MAPPING)
                .bind(user_id)
                .bind(entry.correlation_id.as_str())
                .bind(entry.original_url.as_str())
                .bind(entry.short_key.as_str())
                .execute(&mut *tx)
                .await;

            if let Err(e) = result {
                // Rollback is implicit when the transaction drops.
                if is_unique_violation(&e) {
                    return Err(StoreError::Duplicate(entry.short_key.to_string()));
                }
                return Err(map_sqlx_error(e));
            }
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<OwnedMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, um.user_id, m.original_url, m.short_key
            FROM mappings m
            JOIN user_mappings um ON um.mapping_id = m.id
            WHERE um.user_id = $1
              AND um.is_deleted = FALSE
            ORDER BY m.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(OwnedMapping {
                    id: row.try_get("id").map_err(map_sqlx_error)?,
                    user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
                    original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
                    short_key: row.try_get("short_key").map_err(map_sqlx_error)?,
                })
            })
            .collect()
    }

    async fn find_by_short(&self, user_id: &str, short_key: &str) -> Result<String> {
        // Empty user ID means global resolution (public redirect
        // links); a non-empty one scopes the lookup to that owner.
        let row = if user_id.is_empty() {
            sqlx::query(
                r#"
                SELECT m.original_url
                FROM mappings m
                JOIN user_mappings um ON um.mapping_id = m.id
                WHERE um.is_deleted = FALSE
                  AND m.short_key = $1
                LIMIT 1
                "#,
            )
            .bind(short_key)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                SELECT m.original_url
                FROM mappings m
                JOIN user_mappings um ON um.mapping_id = m.id
                WHERE um.is_deleted = FALSE
                  AND um.user_id = $1
                  AND m.short_key = $2
                LIMIT 1
                "#,
            )
            .bind(user_id)
            .bind(short_key)
            .fetch_optional(&self.pool)
            .await
        }
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(short_key.to_string()));
        };

        row.try_get("original_url").map_err(map_sqlx_error)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl DeleteStore for PostgresStore {
    async fn soft_delete_batch(&self, user_id: &str, short_keys: &[String]) -> Result<()> {
        let keys: Vec<String> = short_keys
            .iter()
            .filter(|k| !k.is_empty())
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE user_mappings um
            SET is_deleted = TRUE
            FROM mappings m
            WHERE m.id = um.mapping_id
              AND um.user_id = $1
              AND m.short_key = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(&keys)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() < keys.len() as u64 {
            // Already-deleted or foreign keys are a no-op, not an
            // error; worth a trace for reconciliation.
            warn!(
                user_id,
                requested = keys.len(),
                affected = result.rows_affected(),
                "soft delete touched fewer rows than requested"
            );
        }

        Ok(())
    }
}
