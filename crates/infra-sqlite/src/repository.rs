// SQLite Repository Implementation

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::error::{AppError, Result};
use catalog_core::port::{ensure_valid, Predicate, Query, Repository};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::context::SqliteDataContext;
use crate::error::map_sqlx_error;
use crate::statement::{
    count_statement, delete_statement, insert_statement, select_by_id, select_statement,
    update_statement, SqlStatement,
};
use crate::table::SqlTable;

/// Relational repository for one entity type, bound to a data context.
///
/// Repositories created from the same context share its transaction and
/// identity map.
pub struct SqliteRepository<T> {
    ctx: Arc<SqliteDataContext>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: SqlTable> SqliteRepository<T> {
    pub fn new(ctx: Arc<SqliteDataContext>) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> &Arc<SqliteDataContext> {
        &self.ctx
    }

    /// Decode parent rows and attach their owned children
    async fn load(&self, operation: &str, rows: Vec<SqliteRow>) -> Result<Vec<T>> {
        let mut entities = rows
            .iter()
            .map(T::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)?;

        if !entities.is_empty() {
            let ids: Vec<String> = entities.iter().map(|e| e.id().to_string()).collect();
            let mut owned = Vec::new();
            for stmt in T::owned_query(&ids) {
                owned.extend(self.ctx.fetch_all(operation, &stmt).await?);
            }
            T::attach_owned(&mut entities, &owned).map_err(map_sqlx_error)?;
        }

        for entity in &entities {
            self.ctx.track(entity);
        }
        Ok(entities)
    }

    fn write_batch(first: SqlStatement, entity: &T) -> Vec<SqlStatement> {
        let mut stmts = vec![first];
        stmts.extend(entity.owned_rows());
        stmts
    }
}

#[async_trait]
impl<T: SqlTable> Repository<T> for SqliteRepository<T> {
    async fn add(&self, mut entity: T) -> Result<T> {
        ensure_valid(&entity)?;
        entity.stamp_created(self.ctx.now_millis());

        let stmts = Self::write_batch(insert_statement(&entity), &entity);
        self.ctx.execute_batch("add", &stmts, false).await?;

        debug!(kind = T::KIND, id = entity.id(), "Entity added");
        self.ctx.track(&entity);
        Ok(entity)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        if let Some(entity) = self.ctx.tracked::<T>(id) {
            return Ok(Some(entity));
        }

        match self.ctx.fetch_optional("get_by_id", &select_by_id::<T>(id)).await? {
            Some(row) => Ok(self.load("get_by_id", vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        self.fetch(&Query::new()).await
    }

    async fn find(&self, predicate: &Predicate) -> Result<Vec<T>> {
        self.fetch(&Query::new().filter(predicate.clone())).await
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        query.validate_for::<T>()?;
        let stmt = select_statement::<T>(query)?;
        let rows = self.ctx.fetch_all("fetch", &stmt).await?;
        self.load("fetch", rows).await
    }

    async fn update(&self, mut entity: T) -> Result<T> {
        ensure_valid(&entity)?;
        entity.stamp_updated(self.ctx.now_millis());

        let stmts = Self::write_batch(update_statement(&entity), &entity);
        if !self.ctx.execute_batch("update", &stmts, true).await? {
            return Err(AppError::NotFound(format!(
                "{} '{}' does not exist",
                T::KIND,
                entity.id()
            )));
        }

        debug!(kind = T::KIND, id = entity.id(), "Entity updated");
        // created_at is never rewritten, so return the row as stored
        self.ctx.untrack::<T>(entity.id());
        let row = self
            .ctx
            .fetch_optional("update", &select_by_id::<T>(entity.id()))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} '{}' vanished", T::KIND, entity.id())))?;
        self.load("update", vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("updated row failed to load".to_string()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self
            .ctx
            .execute_batch("delete", &[delete_statement::<T>(id)], true)
            .await?;
        self.ctx.untrack::<T>(id);
        debug!(kind = T::KIND, id, removed, "Entity delete");
        Ok(removed)
    }

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        if let Some(predicate) = predicate {
            predicate.validate_for::<T>()?;
        }
        let row = self
            .ctx
            .fetch_optional("count", &count_statement::<T>(predicate)?)
            .await?
            .ok_or_else(|| AppError::Database("COUNT returned no row".to_string()))?;
        let count: i64 = row.try_get(0).map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }
}
