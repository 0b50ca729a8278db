// Container: partitioned item storage with throughput accounting

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use catalog_core::port::{Predicate, Query, SortKey};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::ClientOptions;
use crate::error::{DocumentError, StatusCode};
use crate::partition::{PartitionKey, PartitionKeyPath};
use crate::sql::{compare_documents, evaluate, render_condition, render_order_by};
use crate::throughput::{RequestCharge, ThroughputBudget};

/// Server-side default page size
const DEFAULT_MAX_ITEM_COUNT: u32 = 100;

/// Result sets kept alive for unfinished continuations; the oldest is dropped first
const MAX_OPEN_CURSORS: usize = 64;

/// Backoff suggested for an injected 429
const INJECTED_RETRY_AFTER: Duration = Duration::from_millis(10);

/// What a query returns per match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Documents,
    /// `SELECT VALUE COUNT(1)`: a single number item
    Count,
}

/// Parameterized document query.
///
/// `text` and `parameters` are the rendered document SQL, kept for logs and
/// diagnostics; the engine evaluates the structured form.
#[derive(Debug, Clone)]
pub struct QueryDefinition {
    pub text: String,
    pub parameters: Vec<(String, Value)>,
    filter: Option<Predicate>,
    order_by: Vec<SortKey>,
    offset: Option<u64>,
    limit: Option<u64>,
    projection: Projection,
}

impl QueryDefinition {
    pub fn select(query: &Query) -> Self {
        let mut parameters = Vec::new();
        let mut text = "SELECT * FROM c".to_string();

        if let Some(filter) = &query.filter {
            text.push_str(" WHERE ");
            text.push_str(&render_condition(filter, &mut parameters));
        }
        if !query.order_by.is_empty() {
            text.push_str(" ORDER BY ");
            text.push_str(&render_order_by(&query.order_by));
        }
        if query.skip.is_some() || query.take.is_some() {
            // The dialect needs both clauses together
            parameters.push(("@offset".to_string(), Value::from(query.skip.unwrap_or(0))));
            parameters.push((
                "@limit".to_string(),
                Value::from(query.take.unwrap_or(i64::MAX as u64)),
            ));
            text.push_str(" OFFSET @offset LIMIT @limit");
        }

        Self {
            text,
            parameters,
            filter: query.filter.clone(),
            order_by: query.order_by.clone(),
            offset: query.skip,
            limit: query.take,
            projection: Projection::Documents,
        }
    }

    pub fn count(filter: Option<&Predicate>) -> Self {
        let mut parameters = Vec::new();
        let mut text = "SELECT VALUE COUNT(1) FROM c".to_string();
        if let Some(filter) = filter {
            text.push_str(" WHERE ");
            text.push_str(&render_condition(filter, &mut parameters));
        }

        Self {
            text,
            parameters,
            filter: filter.cloned(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            projection: Projection::Count,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }
}

/// Per-request feed options
#[derive(Debug, Clone, Default)]
pub struct FeedOptions {
    /// Page size; `None` uses the server default
    pub max_item_count: Option<u32>,
    /// Token from the previous page
    pub continuation: Option<String>,
    /// Restrict the query to one partition
    pub partition_key: Option<PartitionKey>,
}

/// One page of query results
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<Value>,
    /// Present while more pages remain
    pub continuation: Option<String>,
    pub request_charge: u32,
}

type ItemKey = (String, String);

/// Handle to one container; clones share the same storage.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    name: String,
    partition_key_path: PartitionKeyPath,
    items: RwLock<BTreeMap<ItemKey, Value>>,
    budget: ThroughputBudget,
    options: ClientOptions,
    faults: Mutex<VecDeque<StatusCode>>,
    cursors: Mutex<Cursors>,
}

/// Point-in-time query results addressed by continuation tokens
#[derive(Default)]
struct Cursors {
    next_id: u64,
    open: VecDeque<(u64, Arc<Vec<Value>>)>,
}

impl Container {
    pub(crate) fn new(
        name: String,
        partition_key_path: PartitionKeyPath,
        throughput: u32,
        options: ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                name,
                partition_key_path,
                items: RwLock::new(BTreeMap::new()),
                budget: ThroughputBudget::new(throughput),
                options,
                faults: Mutex::new(VecDeque::new()),
                cursors: Mutex::new(Cursors::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn partition_key_path(&self) -> &PartitionKeyPath {
        &self.inner.partition_key_path
    }

    pub fn throughput(&self) -> u32 {
        self.inner.budget.ru_per_sec()
    }

    pub async fn item_count(&self) -> usize {
        self.inner.items.read().await.len()
    }

    /// Fail the next `times` operations with `status` (429s go through the
    /// normal rate-limit retry loop)
    pub fn inject_fault(&self, status: StatusCode, times: usize) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.extend(std::iter::repeat(status).take(times));
        }
    }

    fn key_of(&self, document: &Value) -> Result<(ItemKey, PartitionKey), DocumentError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DocumentError::bad_request("document must have a non-empty string id"))?;
        let pk = self.inner.partition_key_path.extract(document)?;
        Ok(((pk.storage_key(), id.to_string()), pk))
    }

    /// Insert; 409 when the id already exists in the partition
    pub async fn create_item(&self, document: Value) -> Result<Value, DocumentError> {
        let (key, _) = self.key_of(&document)?;
        self.charge("create_item", RequestCharge::WRITE).await?;

        let mut items = self.inner.items.write().await;
        if items.contains_key(&key) {
            return Err(DocumentError::conflict(format!(
                "item '{}' already exists in container '{}'",
                key.1, self.inner.name
            )));
        }
        items.insert(key, document.clone());
        Ok(document)
    }

    /// Insert or replace
    pub async fn upsert_item(&self, document: Value) -> Result<Value, DocumentError> {
        let (key, _) = self.key_of(&document)?;
        self.charge("upsert_item", RequestCharge::WRITE).await?;

        self.inner.items.write().await.insert(key, document.clone());
        Ok(document)
    }

    /// Point read by id within a partition
    pub async fn read_item(&self, id: &str, partition_key: &PartitionKey) -> Result<Value, DocumentError> {
        self.charge("read_item", RequestCharge::POINT_READ).await?;

        let items = self.inner.items.read().await;
        items
            .get(&(partition_key.storage_key(), id.to_string()))
            .cloned()
            .ok_or_else(|| self.missing(id))
    }

    pub async fn delete_item(&self, id: &str, partition_key: &PartitionKey) -> Result<(), DocumentError> {
        self.charge("delete_item", RequestCharge::DELETE).await?;

        let mut items = self.inner.items.write().await;
        items
            .remove(&(partition_key.storage_key(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| self.missing(id))
    }

    fn missing(&self, id: &str) -> DocumentError {
        DocumentError::not_found(format!(
            "item '{}' not found in container '{}'",
            id, self.inner.name
        ))
    }

    /// Run a query and return one page of it.
    ///
    /// The first page evaluates the query once; continuation tokens page
    /// through that snapshot, so writes made in between are not seen.
    pub async fn query_items(
        &self,
        query: &QueryDefinition,
        options: &FeedOptions,
    ) -> Result<FeedPage, DocumentError> {
        let page_size = options
            .max_item_count
            .unwrap_or(DEFAULT_MAX_ITEM_COUNT)
            .max(1) as usize;

        let (results, cursor, start) = match &options.continuation {
            Some(token) => {
                let (cursor, start) = parse_continuation(token)?;
                (self.resume_cursor(cursor, token)?, Some(cursor), start)
            }
            None => {
                let results = self.evaluate(query, options.partition_key.as_ref()).await;
                (Arc::new(results), None, 0)
            }
        };

        let end = start.saturating_add(page_size).min(results.len());
        let items: Vec<Value> = results.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();
        let continuation = if end < results.len() {
            let cursor = cursor.unwrap_or_else(|| self.open_cursor(results.clone()));
            Some(format!("{}:{}", cursor, end))
        } else {
            if let Some(cursor) = cursor {
                self.close_cursor(cursor);
            }
            None
        };

        let request_charge = RequestCharge::query(items.len());
        self.charge("query_items", request_charge).await?;

        debug!(
            container = %self.inner.name,
            query = %query.text,
            returned = items.len(),
            request_charge,
            "Document query page"
        );
        Ok(FeedPage {
            items,
            continuation,
            request_charge,
        })
    }

    fn open_cursor(&self, results: Arc<Vec<Value>>) -> u64 {
        let mut cursors = self.inner.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        let id = cursors.next_id;
        cursors.next_id += 1;
        if cursors.open.len() >= MAX_OPEN_CURSORS {
            cursors.open.pop_front();
        }
        cursors.open.push_back((id, results));
        id
    }

    fn resume_cursor(&self, cursor: u64, token: &str) -> Result<Arc<Vec<Value>>, DocumentError> {
        let cursors = self.inner.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        cursors
            .open
            .iter()
            .find(|(id, _)| *id == cursor)
            .map(|(_, results)| results.clone())
            .ok_or_else(|| {
                DocumentError::bad_request(format!("continuation token '{}' has expired", token))
            })
    }

    fn close_cursor(&self, cursor: u64) {
        let mut cursors = self.inner.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        cursors.open.retain(|(id, _)| *id != cursor);
    }

    async fn evaluate(&self, query: &QueryDefinition, partition_key: Option<&PartitionKey>) -> Vec<Value> {
        let items = self.inner.items.read().await;
        let partition = partition_key.map(PartitionKey::storage_key);

        let mut matches: Vec<Value> = items
            .iter()
            .filter(|((pk, _), _)| partition.as_ref().map_or(true, |p| p == pk))
            .filter(|(_, doc)| {
                query
                    .filter
                    .as_ref()
                    .map_or(true, |f| evaluate(f, doc) == Some(true))
            })
            .map(|(_, doc)| doc.clone())
            .collect();
        drop(items);

        if !query.order_by.is_empty() {
            matches.sort_by(|a, b| compare_documents(&query.order_by, a, b));
        }

        let skip = query.offset.unwrap_or(0).min(usize::MAX as u64) as usize;
        let take = query.limit.unwrap_or(u64::MAX).min(usize::MAX as u64) as usize;
        let matches: Vec<Value> = matches.into_iter().skip(skip).take(take).collect();

        match query.projection {
            Projection::Documents => matches,
            Projection::Count => vec![Value::from(matches.len() as u64)],
        }
    }

    /// Charge request units, retrying throttled requests the way the client
    /// options allow
    async fn charge(&self, operation: &str, cost: u32) -> Result<(), DocumentError> {
        let options = &self.inner.options;
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let outcome = match self.next_fault() {
                Some(StatusCode::TooManyRequests) => Err(INJECTED_RETRY_AFTER),
                Some(status) => {
                    return Err(DocumentError::new(
                        status,
                        format!("{} failed on container '{}'", operation, self.inner.name),
                    ))
                }
                None => self.inner.budget.try_charge(cost),
            };

            let retry_after = match outcome {
                Ok(()) => return Ok(()),
                Err(retry_after) => retry_after,
            };

            if attempt >= options.max_retry_attempts_on_rate_limit
                || started.elapsed() + retry_after > options.max_retry_wait
            {
                return Err(DocumentError::throttled(retry_after));
            }

            attempt += 1;
            warn!(
                container = %self.inner.name,
                operation,
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "Request rate too large, backing off"
            );
            tokio::time::sleep(retry_after).await;
        }
    }

    fn next_fault(&self) -> Option<StatusCode> {
        self.inner.faults.lock().ok()?.pop_front()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("partition_key_path", &self.inner.partition_key_path)
            .field("throughput", &self.throughput())
            .finish()
    }
}

/// `<cursor>:<offset>`
fn parse_continuation(token: &str) -> Result<(u64, usize), DocumentError> {
    token
        .split_once(':')
        .and_then(|(cursor, offset)| Some((cursor.parse().ok()?, offset.parse().ok()?)))
        .ok_or_else(|| DocumentError::bad_request(format!("malformed continuation token '{}'", token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::port::SortDirection;
    use serde_json::json;

    fn container(path: &str, throughput: u32) -> Container {
        Container::new(
            "products".to_string(),
            PartitionKeyPath::parse(path).unwrap(),
            throughput,
            ClientOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let c = container("/category", 1_000);
        c.create_item(json!({"id": "p-1", "category": "Books"})).await.unwrap();

        let doc = c.read_item("p-1", &PartitionKey::from("Books")).await.unwrap();
        assert_eq!(doc["id"], "p-1");

        let err = c.read_item("p-1", &PartitionKey::from("Games")).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_create_existing_is_conflict_upsert_is_not() {
        let c = container("/id", 1_000);
        c.create_item(json!({"id": "p-1", "v": 1})).await.unwrap();

        let err = c.create_item(json!({"id": "p-1", "v": 2})).await.unwrap_err();
        assert_eq!(err.status, StatusCode::Conflict);

        c.upsert_item(json!({"id": "p-1", "v": 3})).await.unwrap();
        let doc = c.read_item("p-1", &PartitionKey::from("p-1")).await.unwrap();
        assert_eq!(doc["v"], 3);
    }

    #[tokio::test]
    async fn test_missing_id_or_partition_value_is_bad_request() {
        let c = container("/category", 1_000);
        let err = c.create_item(json!({"category": "Books"})).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);

        let err = c.create_item(json!({"id": "p-1"})).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn test_query_pages_follow_continuation() {
        let c = container("/id", 10_000);
        for i in 0..25 {
            c.create_item(json!({"id": format!("p-{:02}", i), "n": i})).await.unwrap();
        }

        let query = QueryDefinition::select(&Query::new().filter(Predicate::ge("n", 5)));
        let mut options = FeedOptions {
            max_item_count: Some(8),
            ..Default::default()
        };
        let mut seen = 0;
        let mut pages = 0;
        loop {
            let page = c.query_items(&query, &options).await.unwrap();
            seen += page.items.len();
            pages += 1;
            match page.continuation {
                Some(token) => options.continuation = Some(token),
                None => break,
            }
        }
        assert_eq!(seen, 20);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn test_writes_between_pages_do_not_shift_results() {
        let c = container("/id", 10_000);
        for i in 0..6 {
            c.create_item(json!({"id": format!("p-{}", i), "n": i})).await.unwrap();
        }

        let query = QueryDefinition::select(&Query::new().order_by("n", SortDirection::Ascending));
        let mut options = FeedOptions {
            max_item_count: Some(3),
            ..Default::default()
        };
        let first = c.query_items(&query, &options).await.unwrap();
        options.continuation = first.continuation;

        // Lands before the cursor position; offset paging would repeat p-2
        c.create_item(json!({"id": "p-early", "n": -1})).await.unwrap();
        let second = c.query_items(&query, &options).await.unwrap();

        let ids: Vec<&str> = first
            .items
            .iter()
            .chain(&second.items)
            .filter_map(|doc| doc["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["p-0", "p-1", "p-2", "p-3", "p-4", "p-5"]);
        assert!(second.continuation.is_none());
    }

    #[tokio::test]
    async fn test_finished_continuation_cannot_be_resumed() {
        let c = container("/id", 10_000);
        for i in 0..4 {
            c.create_item(json!({"id": format!("p-{}", i)})).await.unwrap();
        }

        let query = QueryDefinition::select(&Query::new());
        let mut options = FeedOptions {
            max_item_count: Some(2),
            ..Default::default()
        };
        let token = c.query_items(&query, &options).await.unwrap().continuation;
        options.continuation = token;
        let last = c.query_items(&query, &options).await.unwrap();
        assert!(last.continuation.is_none());

        let err = c.query_items(&query, &options).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);
        assert!(err.message.contains("expired"));
    }

    #[tokio::test]
    async fn test_count_projection() {
        let c = container("/category", 1_000);
        for (id, category) in [("a", "Books"), ("b", "Books"), ("c", "Games")] {
            c.create_item(json!({"id": id, "category": category})).await.unwrap();
        }

        let query = QueryDefinition::count(Some(&Predicate::eq("category", "Books")));
        assert_eq!(query.text, "SELECT VALUE COUNT(1) FROM c WHERE c.category = @p0");
        let page = c.query_items(&query, &FeedOptions::default()).await.unwrap();
        assert_eq!(page.items, vec![json!(2)]);
    }

    #[tokio::test]
    async fn test_partition_scoped_query() {
        let c = container("/category", 1_000);
        for (id, category) in [("a", "Books"), ("b", "Games")] {
            c.create_item(json!({"id": id, "category": category})).await.unwrap();
        }

        let options = FeedOptions {
            partition_key: Some(PartitionKey::from("Games")),
            ..Default::default()
        };
        let page = c
            .query_items(&QueryDefinition::select(&Query::new()), &options)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["id"], "b");
    }

    #[tokio::test]
    async fn test_malformed_continuation_is_bad_request() {
        let c = container("/id", 1_000);
        let options = FeedOptions {
            continuation: Some("not-a-token".to_string()),
            ..Default::default()
        };
        let err = c
            .query_items(&QueryDefinition::select(&Query::new()), &options)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BadRequest);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_write_is_retried() {
        let c = container("/id", 5);
        c.create_item(json!({"id": "a"})).await.unwrap();
        // Budget is empty; the client waits for a refill instead of failing
        c.create_item(json!({"id": "b"})).await.unwrap();
        assert_eq!(c.item_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_throttling_exhausts_retries() {
        let c = container("/id", 1_000);
        c.inject_fault(StatusCode::TooManyRequests, 20);

        let err = c.create_item(json!({"id": "a"})).await.unwrap_err();
        assert_eq!(err.status, StatusCode::TooManyRequests);
        assert!(err.retry_after.is_some());
    }

    #[tokio::test]
    async fn test_injected_unavailable_is_not_retried() {
        let c = container("/id", 1_000);
        c.inject_fault(StatusCode::ServiceUnavailable, 1);

        let err = c.create_item(json!({"id": "a"})).await.unwrap_err();
        assert_eq!(err.status, StatusCode::ServiceUnavailable);
        c.create_item(json!({"id": "a"})).await.unwrap();
    }
}
