// Document Session Factory

use std::sync::Arc;

use catalog_core::domain::{Customer, Entity, Order, Product};
use catalog_core::error::Result;
use catalog_core::port::{CatalogSession, Repository, SessionFactory, TimeProvider};
use tracing::info;

use crate::client::{ContainerProperties, Database, DocumentClient};
use crate::error::map_document_error;
use crate::repository::{DocumentRepository, DocumentRepositoryConfig};

/// Database layout for the catalog containers
#[derive(Debug, Clone)]
pub struct DocumentStoreSettings {
    pub database: String,
    /// Request units per second for each container
    pub throughput: u32,
    pub products_partition_key: String,
    pub customers_partition_key: String,
    pub orders_partition_key: String,
}

impl Default for DocumentStoreSettings {
    fn default() -> Self {
        Self {
            database: "catalog".to_string(),
            throughput: 400,
            products_partition_key: "/id".to_string(),
            customers_partition_key: "/id".to_string(),
            orders_partition_key: "/id".to_string(),
        }
    }
}

/// Repositories bound to process-wide containers.
///
/// Sessions share the same repositories and never carry a unit of work.
#[derive(Clone)]
pub struct DocumentSessionFactory {
    products: Arc<DocumentRepository<Product>>,
    customers: Arc<DocumentRepository<Customer>>,
    orders: Arc<DocumentRepository<Order>>,
}

impl DocumentSessionFactory {
    /// Create the database and containers if needed and bind repositories
    pub async fn connect(
        client: &DocumentClient,
        settings: &DocumentStoreSettings,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        let database = client
            .create_database_if_not_exists(&settings.database)
            .await
            .map_err(map_document_error)?;

        let products = bind::<Product>(
            &database,
            "products",
            &settings.products_partition_key,
            settings.throughput,
            time_provider.clone(),
        )
        .await?;
        let customers = bind::<Customer>(
            &database,
            "customers",
            &settings.customers_partition_key,
            settings.throughput,
            time_provider.clone(),
        )
        .await?;
        let orders = bind::<Order>(
            &database,
            "orders",
            &settings.orders_partition_key,
            settings.throughput,
            time_provider,
        )
        .await?;

        info!(database = %settings.database, "Document store ready");
        Ok(Self {
            products: Arc::new(products),
            customers: Arc::new(customers),
            orders: Arc::new(orders),
        })
    }

    pub fn products(&self) -> Arc<DocumentRepository<Product>> {
        self.products.clone()
    }

    pub fn customers(&self) -> Arc<DocumentRepository<Customer>> {
        self.customers.clone()
    }

    pub fn orders(&self) -> Arc<DocumentRepository<Order>> {
        self.orders.clone()
    }
}

async fn bind<T: Entity>(
    database: &Database,
    container: &str,
    partition_key_path: &str,
    throughput: u32,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<DocumentRepository<T>> {
    let container = database
        .create_container_if_not_exists(ContainerProperties::new(
            container,
            partition_key_path,
            throughput,
        ))
        .await
        .map_err(map_document_error)?;

    DocumentRepository::new(
        DocumentRepositoryConfig {
            container,
            partition_key_path: partition_key_path.to_string(),
        },
        time_provider,
    )
}

impl SessionFactory for DocumentSessionFactory {
    fn open_session(&self) -> CatalogSession {
        CatalogSession {
            products: self.products.clone() as Arc<dyn Repository<Product>>,
            customers: self.customers.clone() as Arc<dyn Repository<Customer>>,
            orders: self.orders.clone() as Arc<dyn Repository<Order>>,
            unit_of_work: None,
        }
    }

    fn backend(&self) -> &'static str {
        "document"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::port::time_provider::SystemTimeProvider;

    #[tokio::test]
    async fn test_sessions_share_containers_and_have_no_unit_of_work() {
        let client = DocumentClient::default();
        let factory = DocumentSessionFactory::connect(
            &client,
            &DocumentStoreSettings::default(),
            Arc::new(SystemTimeProvider),
        )
        .await
        .unwrap();

        let first = factory.open_session();
        assert!(first.unit_of_work.is_none());
        first
            .products
            .add(Product::new("p-1", "Laptop", 999.0, "Electronics"))
            .await
            .unwrap();

        let second = factory.open_session();
        assert!(second.products.get_by_id("p-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_partition_path() {
        let settings = DocumentStoreSettings {
            customers_partition_key: "country".to_string(),
            ..Default::default()
        };
        let result =
            DocumentSessionFactory::connect(&DocumentClient::default(), &settings, Arc::new(SystemTimeProvider)).await;
        assert!(result.is_err());
    }
}
