// Request-scoped data context: pool, optional transaction, identity map

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use catalog_core::application::RetryPolicy;
use catalog_core::domain::Entity;
use catalog_core::error::Result;
use catalog_core::port::TimeProvider;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Connection, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{is_transient, map_sqlx_error};
use crate::statement::SqlStatement;

type TrackKey = (&'static str, String);

/// One logical request against the relational store.
///
/// Writes flush immediately unless a transaction was begun through the
/// `UnitOfWork` impl, in which case every statement joins it. Rows read or
/// written are kept in an identity map so repeated `get_by_id` calls inside
/// the same request do not hit the database.
///
/// Not meant to be shared between concurrent requests.
pub struct SqliteDataContext {
    pub(crate) pool: SqlitePool,
    pub(crate) tx: Mutex<Option<Transaction<'static, Sqlite>>>,
    tracked: StdMutex<HashMap<TrackKey, Value>>,
    retry: RetryPolicy,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteDataContext {
    pub fn new(pool: SqlitePool, retry: RetryPolicy, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            tx: Mutex::new(None),
            tracked: StdMutex::new(HashMap::new()),
            retry,
            time_provider,
        }
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.time_provider.now_millis()
    }

    pub(crate) async fn fetch_all(&self, operation: &str, stmt: &SqlStatement) -> Result<Vec<SqliteRow>> {
        debug!(operation, sql = %stmt.sql, "SQL query");

        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.as_mut() {
            return stmt
                .query()
                .fetch_all(&mut **tx)
                .await
                .map_err(map_sqlx_error);
        }
        drop(guard);

        let pool = &self.pool;
        self.retry
            .run(operation, is_transient, move || stmt.query().fetch_all(pool))
            .await
            .map_err(map_sqlx_error)
    }

    pub(crate) async fn fetch_optional(
        &self,
        operation: &str,
        stmt: &SqlStatement,
    ) -> Result<Option<SqliteRow>> {
        Ok(self.fetch_all(operation, stmt).await?.into_iter().next())
    }

    /// Run `stmts` atomically.
    ///
    /// With `require_first_row`, a first statement that touches no row makes
    /// the whole batch a no-op and returns `false`.
    pub(crate) async fn execute_batch(
        &self,
        operation: &str,
        stmts: &[SqlStatement],
        require_first_row: bool,
    ) -> Result<bool> {
        debug!(operation, statements = stmts.len(), "SQL batch");

        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.as_mut() {
            // Savepoint so a failed batch leaves nothing behind in the open transaction
            let mut savepoint = Connection::begin(&mut **tx).await.map_err(map_sqlx_error)?;
            return match apply_batch(&mut savepoint, stmts, require_first_row).await {
                Ok(true) => {
                    savepoint.commit().await.map_err(map_sqlx_error)?;
                    Ok(true)
                }
                Ok(false) => {
                    savepoint.rollback().await.map_err(map_sqlx_error)?;
                    Ok(false)
                }
                Err(err) => {
                    if let Err(rollback_err) = savepoint.rollback().await {
                        warn!(operation, error = %rollback_err, "Savepoint rollback failed");
                    }
                    Err(map_sqlx_error(err))
                }
            };
        }
        drop(guard);

        let pool = &self.pool;
        self.retry
            .run(operation, is_transient, move || async move {
                let mut tx = pool.begin().await?;
                let applied = apply_batch(&mut tx, stmts, require_first_row).await?;
                if applied {
                    tx.commit().await?;
                }
                Ok(applied)
            })
            .await
            .map_err(map_sqlx_error)
    }

    pub(crate) fn track<T: Entity>(&self, entity: &T) {
        let Ok(snapshot) = serde_json::to_value(entity) else {
            return;
        };
        if let Ok(mut tracked) = self.tracked.lock() {
            tracked.insert((T::KIND, entity.id().to_string()), snapshot);
        }
    }

    pub(crate) fn tracked<T: Entity>(&self, id: &str) -> Option<T> {
        let tracked = self.tracked.lock().ok()?;
        let snapshot = tracked.get(&(T::KIND, id.to_string()))?;
        serde_json::from_value(snapshot.clone()).ok()
    }

    pub(crate) fn untrack<T: Entity>(&self, id: &str) {
        if let Ok(mut tracked) = self.tracked.lock() {
            tracked.remove(&(T::KIND, id.to_string()));
        }
    }

    pub(crate) fn clear_tracked(&self) {
        if let Ok(mut tracked) = self.tracked.lock() {
            tracked.clear();
        }
    }

    /// Number of tracked entities
    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().map(|t| t.len()).unwrap_or(0)
    }
}

async fn apply_batch(
    conn: &mut SqliteConnection,
    stmts: &[SqlStatement],
    require_first_row: bool,
) -> std::result::Result<bool, sqlx::Error> {
    for (i, stmt) in stmts.iter().enumerate() {
        let result = stmt.query().execute(&mut *conn).await?;
        if i == 0 && require_first_row && result.rows_affected() == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::create_pool;
    use crate::migration::run_migrations;
    use catalog_core::domain::Product;
    use catalog_core::error::AppError;
    use catalog_core::port::time_provider::ManualTimeProvider;
    use catalog_core::port::UnitOfWork;

    async fn context() -> SqliteDataContext {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteDataContext::new(pool, RetryPolicy::none(), Arc::new(ManualTimeProvider::new(1_000)))
    }

    #[tokio::test]
    async fn test_identity_map_round_trip() {
        let ctx = context().await;
        let product = Product::new("p-1", "Laptop", 10.0, "Electronics");

        ctx.track(&product);
        assert_eq!(ctx.tracked::<Product>("p-1"), Some(product));
        assert_eq!(ctx.tracked_count(), 1);

        ctx.untrack::<Product>("p-1");
        assert!(ctx.tracked::<Product>("p-1").is_none());
    }

    #[tokio::test]
    async fn test_batch_requiring_first_row_is_noop_when_missing() {
        let ctx = context().await;
        let stmts = vec![
            SqlStatement::new("UPDATE products SET name = ? WHERE id = ?")
                .bind("x")
                .bind("missing"),
            SqlStatement::new(
                "INSERT INTO products (id, name, price, category, created_at) VALUES ('p-9', 'n', 1.0, 'c', 0)",
            ),
        ];

        let applied = ctx.execute_batch("test", &stmts, true).await.unwrap();
        assert!(!applied);

        let rows = ctx
            .fetch_all("test", &SqlStatement::new("SELECT id FROM products"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_inside_transaction_leaves_no_rows() {
        let ctx = context().await;
        let insert = |id: &str| {
            SqlStatement::new(
                "INSERT INTO products (id, name, price, category, created_at) VALUES (?, 'n', 1.0, 'c', 0)",
            )
            .bind(id)
        };

        ctx.begin_transaction().await.unwrap();
        ctx.execute_batch("test", &[insert("p-1")], false).await.unwrap();

        let err = ctx
            .execute_batch("test", &[insert("p-2"), insert("p-1")], false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The caller ignores the failure and commits anyway
        ctx.commit_transaction().await.unwrap();

        let rows = ctx
            .fetch_all("test", &SqlStatement::new("SELECT id FROM products ORDER BY id"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
