//! Products from the document store, customers and orders from SQLite

use catalog_core::domain::{Customer, Order, Product};
use catalog_core::port::{CatalogSession, Repository, SessionFactory, UnitOfWork};
use catalog_infra_document::DocumentSessionFactory;
use catalog_infra_sqlite::{SqliteRepository, SqliteSessionFactory};
use std::sync::Arc;

/// Each session gets a fresh SQLite context for customers and orders.
///
/// The unit of work covers only the SQLite repositories; product writes
/// are applied immediately and are not rolled back with it.
#[derive(Clone)]
pub struct HybridSessionFactory {
    documents: DocumentSessionFactory,
    relational: SqliteSessionFactory,
}

impl HybridSessionFactory {
    pub fn new(documents: DocumentSessionFactory, relational: SqliteSessionFactory) -> Self {
        Self {
            documents,
            relational,
        }
    }
}

impl SessionFactory for HybridSessionFactory {
    fn open_session(&self) -> CatalogSession {
        let ctx = self.relational.open_context();
        CatalogSession {
            products: self.documents.products() as Arc<dyn Repository<Product>>,
            customers: Arc::new(SqliteRepository::<Customer>::new(ctx.clone())),
            orders: Arc::new(SqliteRepository::<Order>::new(ctx.clone())),
            unit_of_work: Some(ctx as Arc<dyn UnitOfWork>),
        }
    }

    fn backend(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::application::RetryPolicy;
    use catalog_core::port::time_provider::SystemTimeProvider;
    use catalog_core::port::TransactionScope;
    use catalog_infra_document::{DocumentClient, DocumentStoreSettings};
    use catalog_infra_sqlite::{create_pool, run_migrations};
    use std::time::Duration;

    async fn factory() -> HybridSessionFactory {
        let clock = Arc::new(SystemTimeProvider);
        let documents = DocumentSessionFactory::connect(
            &DocumentClient::default(),
            &DocumentStoreSettings::default(),
            clock.clone(),
        )
        .await
        .unwrap();
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let retry = RetryPolicy::new(5, Duration::from_millis(5), Duration::from_millis(50));
        HybridSessionFactory::new(documents, SqliteSessionFactory::new(pool, retry, clock))
    }

    #[tokio::test]
    async fn test_rollback_spares_document_writes() {
        let factory = factory().await;
        let session = factory.open_session();
        let uow = session.unit_of_work.clone().unwrap();

        let scope = TransactionScope::begin(uow).await.unwrap();
        session
            .products
            .add(Product::new("p-1", "Laptop", 999.0, "Electronics"))
            .await
            .unwrap();
        session
            .customers
            .add(Customer::new("c-1", "Ada", "Lovelace", "ada@example.com", "UK"))
            .await
            .unwrap();
        scope.rollback().await.unwrap();

        let fresh = factory.open_session();
        assert!(fresh.products.get_by_id("p-1").await.unwrap().is_some());
        assert!(fresh.customers.get_by_id("c-1").await.unwrap().is_none());
        assert_eq!(factory.backend(), "hybrid");
    }
}
