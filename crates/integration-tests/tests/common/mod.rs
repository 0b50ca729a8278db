//! Backend fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use catalog_core::application::RetryPolicy;
use catalog_core::domain::{Customer, Product};
use catalog_core::port::time_provider::ManualTimeProvider;
use catalog_core::port::SessionFactory;
use catalog_infra_document::{DocumentClient, DocumentSessionFactory, DocumentStoreSettings};
use catalog_infra_sqlite::{create_pool, run_migrations, SqliteSessionFactory};

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Backend {
    pub name: &'static str,
    pub sessions: Arc<dyn SessionFactory>,
    pub clock: Arc<ManualTimeProvider>,
}

/// Retry briefly: shared-cache readers can see SQLITE_LOCKED after a rollback
pub fn test_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(5), Duration::from_millis(50))
}

pub async fn sqlite_factory(clock: Arc<ManualTimeProvider>) -> SqliteSessionFactory {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    SqliteSessionFactory::new(pool, test_retry(), clock)
}

pub async fn document_factory(
    clock: Arc<ManualTimeProvider>,
    settings: &DocumentStoreSettings,
) -> DocumentSessionFactory {
    DocumentSessionFactory::connect(&DocumentClient::default(), settings, clock)
        .await
        .unwrap()
}

pub async fn sqlite_backend() -> Backend {
    let clock = Arc::new(ManualTimeProvider::new(START_MILLIS));
    Backend {
        name: "sqlite",
        sessions: Arc::new(sqlite_factory(clock.clone()).await),
        clock,
    }
}

pub async fn document_backend() -> Backend {
    let clock = Arc::new(ManualTimeProvider::new(START_MILLIS));
    Backend {
        name: "document",
        sessions: Arc::new(document_factory(clock.clone(), &DocumentStoreSettings::default()).await),
        clock,
    }
}

/// Fresh, empty instances of every backend
pub async fn backends() -> Vec<Backend> {
    vec![sqlite_backend().await, document_backend().await]
}

pub fn product(n: usize) -> Product {
    let category = if n % 2 == 0 { "Electronics" } else { "Books" };
    Product::new(format!("p-{:03}", n), format!("Product {}", n), 10.0 + n as f64, category)
        .with_stock(n as i64)
}

pub fn customer(id: &str, country: &str) -> Customer {
    Customer::new(id, "Ada", "Lovelace", format!("{}@example.com", id), country)
}
