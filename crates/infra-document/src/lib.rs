// Catalog Infrastructure - Document Store Adapter
// Embedded partitioned document engine + Repository<T> over its containers

mod client;
mod container;
mod error;
mod partition;
mod repository;
mod session;
mod sql;
mod throughput;

pub use client::{ClientOptions, ContainerProperties, Database, DocumentClient};
pub use container::{Container, FeedOptions, FeedPage, Projection, QueryDefinition};
pub use error::{map_document_error, DocumentError, StatusCode};
pub use partition::{PartitionKey, PartitionKeyPath};
pub use repository::{DocumentRepository, DocumentRepositoryConfig};
pub use session::{DocumentSessionFactory, DocumentStoreSettings};
pub use throughput::{RequestCharge, ThroughputBudget};
