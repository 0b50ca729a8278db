// SQLite Session Factory

use std::sync::Arc;

use catalog_core::application::RetryPolicy;
use catalog_core::domain::{Customer, Order, Product};
use catalog_core::port::{CatalogSession, SessionFactory, TimeProvider, UnitOfWork};
use sqlx::SqlitePool;

use crate::context::SqliteDataContext;
use crate::repository::SqliteRepository;

/// Opens one tracked context per session over a shared pool
#[derive(Clone)]
pub struct SqliteSessionFactory {
    pool: SqlitePool,
    retry: RetryPolicy,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSessionFactory {
    pub fn new(pool: SqlitePool, retry: RetryPolicy, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            retry,
            time_provider,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn open_context(&self) -> Arc<SqliteDataContext> {
        Arc::new(SqliteDataContext::new(
            self.pool.clone(),
            self.retry.clone(),
            self.time_provider.clone(),
        ))
    }
}

impl SessionFactory for SqliteSessionFactory {
    fn open_session(&self) -> CatalogSession {
        let ctx = self.open_context();
        CatalogSession {
            products: Arc::new(SqliteRepository::<Product>::new(ctx.clone())),
            customers: Arc::new(SqliteRepository::<Customer>::new(ctx.clone())),
            orders: Arc::new(SqliteRepository::<Order>::new(ctx.clone())),
            unit_of_work: Some(ctx as Arc<dyn UnitOfWork>),
        }
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
