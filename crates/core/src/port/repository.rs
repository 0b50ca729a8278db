// Repository Port (Interface)

use async_trait::async_trait;

use crate::domain::{DomainError, Entity};
use crate::error::{AppError, Result};
use crate::port::query::{page_query, Page, Predicate, Query};

/// Run entity validation before a write; a rejected entity is a bad argument
pub fn ensure_valid<T: Entity>(entity: &T) -> Result<()> {
    entity.validate().map_err(|e| match e {
        DomainError::ValidationError(msg) => {
            AppError::InvalidArgument(format!("{}: {}", T::KIND, msg))
        }
        other => AppError::Domain(other),
    })
}

/// Generic persistence contract every storage adapter satisfies.
///
/// Adapters stamp `created_at` on `add` and `updated_at` on `update`.
/// Id-based misses are values, not errors: `get_by_id` returns `None` and
/// `delete` returns `false`. Backend faults surface as
/// `AppError::BackendUnavailable` or `AppError::Database`.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Stamp `created_at`, insert and return the stored form
    async fn add(&self, entity: T) -> Result<T>;

    /// Point lookup by id
    async fn get_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Unbounded scan of the whole container/table
    async fn get_all(&self) -> Result<Vec<T>>;

    /// Server-side filter
    async fn find(&self, predicate: &Predicate) -> Result<Vec<T>>;

    async fn first_or_default(&self, predicate: &Predicate) -> Result<Option<T>> {
        let query = Query::new().filter(predicate.clone()).take(1);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    /// Start a composable query; run it with `fetch`
    fn query(&self) -> Query {
        Query::new()
    }

    /// Execute a composed query
    async fn fetch(&self, query: &Query) -> Result<Vec<T>>;

    /// Stamp `updated_at` and persist a full replacement
    async fn update(&self, entity: T) -> Result<T>;

    /// Remove by id; `false` when nothing was there
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64>;

    async fn exists(&self, predicate: &Predicate) -> Result<bool> {
        Ok(self.first_or_default(predicate).await?.is_some())
    }

    /// 1-indexed page plus the total size of the filtered set.
    ///
    /// Runs the count and the windowed fetch as two separate calls.
    async fn get_paged(
        &self,
        page_number: u32,
        page_size: u32,
        predicate: Option<&Predicate>,
    ) -> Result<Page<T>> {
        let query = page_query(page_number, page_size, predicate)?;
        let total_count = self.count(predicate).await?;
        let items = self.fetch(&query).await?;

        Ok(Page {
            items,
            total_count,
            page_number,
            page_size,
        })
    }
}
