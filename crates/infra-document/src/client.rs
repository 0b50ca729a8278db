// Document client: databases and containers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use crate::container::Container;
use crate::error::DocumentError;
use crate::partition::PartitionKeyPath;

/// Client-side retry behaviour for throttled (429) requests
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub max_retry_attempts_on_rate_limit: u32,
    pub max_retry_wait: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_retry_attempts_on_rate_limit: 9,
            max_retry_wait: Duration::from_secs(30),
        }
    }
}

/// Container settings fixed at creation
#[derive(Debug, Clone)]
pub struct ContainerProperties {
    pub name: String,
    pub partition_key_path: String,
    /// Request units per second
    pub throughput: u32,
}

impl ContainerProperties {
    pub fn new(name: impl Into<String>, partition_key_path: impl Into<String>, throughput: u32) -> Self {
        Self {
            name: name.into(),
            partition_key_path: partition_key_path.into(),
            throughput,
        }
    }
}

/// Process-wide handle to the document engine.
///
/// Cheap to clone and safe to share between concurrent requests; all state
/// lives behind one `Arc`.
#[derive(Clone, Default)]
pub struct DocumentClient {
    inner: Arc<ClientInner>,
}

#[derive(Default)]
struct ClientInner {
    options: ClientOptions,
    databases: RwLock<HashMap<String, Database>>,
}

impl DocumentClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                databases: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub async fn create_database_if_not_exists(&self, name: &str) -> Result<Database, DocumentError> {
        if name.trim().is_empty() {
            return Err(DocumentError::bad_request("database name cannot be empty"));
        }

        let mut databases = self.inner.databases.write().await;
        let database = databases
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(database = name, "Document database created");
                Database::new(name.to_string(), self.inner.options.clone())
            })
            .clone();
        Ok(database)
    }
}

/// Handle to one database
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    name: String,
    options: ClientOptions,
    containers: RwLock<HashMap<String, Container>>,
}

impl Database {
    fn new(name: String, options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                name,
                options,
                containers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Create the container, or return the existing one.
    ///
    /// Throughput of an existing container is left as it is; a different
    /// partition key path is a conflict because it cannot be changed.
    pub async fn create_container_if_not_exists(
        &self,
        properties: ContainerProperties,
    ) -> Result<Container, DocumentError> {
        if properties.name.trim().is_empty() {
            return Err(DocumentError::bad_request("container name cannot be empty"));
        }
        let path = PartitionKeyPath::parse(&properties.partition_key_path)?;

        let mut containers = self.inner.containers.write().await;
        if let Some(existing) = containers.get(&properties.name) {
            if existing.partition_key_path() != &path {
                return Err(DocumentError::conflict(format!(
                    "container '{}' is partitioned by {}, not {}",
                    properties.name,
                    existing.partition_key_path(),
                    path
                )));
            }
            return Ok(existing.clone());
        }

        let container = Container::new(
            properties.name.clone(),
            path,
            properties.throughput,
            self.inner.options.clone(),
        );
        info!(
            database = %self.inner.name,
            container = %properties.name,
            partition_key = %properties.partition_key_path,
            throughput = properties.throughput,
            "Document container created"
        );
        containers.insert(properties.name, container.clone());
        Ok(container)
    }
}
