// In-memory repository used by application unit tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::domain::{Customer, Entity, Order, Product};
use crate::error::{AppError, Result};
use crate::port::{CatalogSession, CompareOp, Predicate, Query, Repository};

pub(crate) struct MemoryRepository<T> {
    rows: Mutex<BTreeMap<String, T>>,
}

impl<T> MemoryRepository<T> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn matches<T: Entity>(entity: &T, predicate: &Predicate) -> Result<bool> {
    match predicate {
        Predicate::All => Ok(true),
        Predicate::Compare {
            field,
            op: CompareOp::Eq,
            value,
        } => Ok(serde_json::to_value(entity)?.get(field) == Some(value)),
        other => Err(AppError::InvalidArgument(format!(
            "unsupported in test repository: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn add(&self, mut entity: T) -> Result<T> {
        entity.stamp_created(1);
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(entity.id()) {
            return Err(AppError::Conflict(entity.id().to_string()));
        }
        rows.insert(entity.id().to_string(), entity.clone());
        Ok(entity)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn find(&self, predicate: &Predicate) -> Result<Vec<T>> {
        let rows = self.rows.lock().unwrap();
        let mut out = Vec::new();
        for entity in rows.values() {
            if matches(entity, predicate)? {
                out.push(entity.clone());
            }
        }
        Ok(out)
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        let filter = query.filter.clone().unwrap_or(Predicate::All);
        let found = self.find(&filter).await?;
        let skip = query.skip.unwrap_or(0) as usize;
        let take = query.take.map(|t| t as usize).unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(skip).take(take).collect())
    }

    async fn update(&self, mut entity: T) -> Result<T> {
        entity.stamp_updated(2);
        self.rows
            .lock()
            .unwrap()
            .insert(entity.id().to_string(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        let filter = predicate.cloned().unwrap_or(Predicate::All);
        Ok(self.find(&filter).await?.len() as u64)
    }
}

pub(crate) struct MemoryStores {
    pub customers: Arc<MemoryRepository<Customer>>,
    pub orders: Arc<MemoryRepository<Order>>,
}

pub(crate) fn memory_session() -> (CatalogSession, MemoryStores) {
    let customers = Arc::new(MemoryRepository::<Customer>::new());
    let orders = Arc::new(MemoryRepository::<Order>::new());
    let session = CatalogSession {
        products: Arc::new(MemoryRepository::<Product>::new()),
        customers: customers.clone(),
        orders: orders.clone(),
        unit_of_work: None,
    };
    (session, MemoryStores { customers, orders })
}
