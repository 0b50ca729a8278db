// Document Repository Implementation

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::domain::Entity;
use catalog_core::error::{AppError, Result};
use catalog_core::port::{ensure_valid, Predicate, Query, Repository, TimeProvider};
use serde_json::Value;
use tracing::debug;

use crate::container::{Container, FeedOptions, QueryDefinition};
use crate::error::map_document_error;
use crate::partition::{PartitionKey, PartitionKeyPath};

/// Which container a repository talks to, and how it is partitioned
#[derive(Debug, Clone)]
pub struct DocumentRepositoryConfig {
    pub container: Container,
    pub partition_key_path: String,
}

/// Document-store repository for one entity type.
///
/// `update` is an upsert, so it also succeeds for ids that were never
/// added; `add` refuses an existing id. Id-only point operations need the
/// container to be partitioned by `/id`, otherwise use the
/// `*_in_partition` variants.
pub struct DocumentRepository<T> {
    container: Container,
    partition_key_path: PartitionKeyPath,
    page_size: Option<u32>,
    time_provider: Arc<dyn TimeProvider>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DocumentRepository<T> {
    pub fn new(config: DocumentRepositoryConfig, time_provider: Arc<dyn TimeProvider>) -> Result<Self> {
        let partition_key_path =
            PartitionKeyPath::parse(&config.partition_key_path).map_err(map_document_error)?;
        if config.container.partition_key_path() != &partition_key_path {
            return Err(AppError::Config(format!(
                "{} repository expects partition key {} but container '{}' uses {}",
                T::KIND,
                partition_key_path,
                config.container.name(),
                config.container.partition_key_path()
            )));
        }

        Ok(Self {
            container: config.container,
            partition_key_path,
            page_size: None,
            time_provider,
            _entity: PhantomData,
        })
    }

    /// Page size used when materializing query results
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Point read inside an explicit partition
    pub async fn get_in_partition(&self, id: &str, partition_key: impl Into<PartitionKey>) -> Result<Option<T>> {
        match self.container.read_item(id, &partition_key.into()).await {
            Ok(doc) => Ok(Some(serde_json::from_value(doc)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(map_document_error(err)),
        }
    }

    /// Delete inside an explicit partition; `false` when nothing was there
    pub async fn delete_in_partition(&self, id: &str, partition_key: impl Into<PartitionKey>) -> Result<bool> {
        match self.container.delete_item(id, &partition_key.into()).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(map_document_error(err)),
        }
    }

    fn require_id_partitioning(&self, operation: &str) -> Result<()> {
        if self.partition_key_path.is_id() {
            return Ok(());
        }
        Err(AppError::InvalidArgument(format!(
            "{} by id alone requires partition key path /id, but container '{}' is partitioned by {}; use {}_in_partition",
            operation,
            self.container.name(),
            self.partition_key_path,
            operation
        )))
    }

    fn to_document(&self, entity: &T) -> Result<Value> {
        let doc = serde_json::to_value(entity)?;
        // Surface a missing partition value before any request is charged
        self.partition_key_path
            .extract(&doc)
            .map_err(map_document_error)?;
        Ok(doc)
    }

    /// Follow continuation tokens until the result set is exhausted
    async fn materialize(&self, definition: &QueryDefinition) -> Result<Vec<Value>> {
        let mut options = FeedOptions {
            max_item_count: self.page_size,
            ..Default::default()
        };
        let mut results = Vec::new();
        let mut request_charge = 0u64;

        loop {
            let page = self
                .container
                .query_items(definition, &options)
                .await
                .map_err(map_document_error)?;
            request_charge += u64::from(page.request_charge);
            results.extend(page.items);

            match page.continuation {
                Some(token) => options.continuation = Some(token),
                None => break,
            }
        }

        debug!(
            kind = T::KIND,
            query = %definition.text,
            results = results.len(),
            request_charge,
            "Document query materialized"
        );
        Ok(results)
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for DocumentRepository<T> {
    async fn add(&self, mut entity: T) -> Result<T> {
        ensure_valid(&entity)?;
        entity.stamp_created(self.time_provider.now_millis());

        let doc = self.to_document(&entity)?;
        self.container
            .create_item(doc)
            .await
            .map_err(map_document_error)?;

        debug!(kind = T::KIND, id = entity.id(), "Document created");
        Ok(entity)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        self.require_id_partitioning("get")?;
        self.get_in_partition(id, id).await
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        self.fetch(&Query::new()).await
    }

    async fn find(&self, predicate: &Predicate) -> Result<Vec<T>> {
        self.fetch(&Query::new().filter(predicate.clone())).await
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        query.validate_for::<T>()?;
        self.materialize(&QueryDefinition::select(query))
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    async fn update(&self, mut entity: T) -> Result<T> {
        ensure_valid(&entity)?;
        let now = self.time_provider.now_millis();

        // createdAt comes from the stored document, or is now for an insert
        let partition_key = self
            .partition_key_path
            .extract(&serde_json::to_value(&entity)?)
            .map_err(map_document_error)?;
        let created_at = match self.container.read_item(entity.id(), &partition_key).await {
            Ok(stored) => serde_json::from_value::<T>(stored)?.created_at(),
            Err(err) if err.is_not_found() => now,
            Err(err) => return Err(map_document_error(err)),
        };
        entity.stamp_created(created_at);
        entity.stamp_updated(now);

        let doc = self.to_document(&entity)?;
        self.container
            .upsert_item(doc)
            .await
            .map_err(map_document_error)?;

        debug!(kind = T::KIND, id = entity.id(), "Document upserted");
        Ok(entity)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.require_id_partitioning("delete")?;
        self.delete_in_partition(id, id).await
    }

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        if let Some(predicate) = predicate {
            predicate.validate_for::<T>()?;
        }
        let items = self.materialize(&QueryDefinition::count(predicate)).await?;
        items
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| AppError::Internal("count query returned no value".to_string()))
    }
}
