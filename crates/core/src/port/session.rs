// Session Port - per-request bundle of repositories

use std::sync::Arc;

use crate::domain::{Customer, Order, Product};
use crate::port::repository::Repository;
use crate::port::unit_of_work::UnitOfWork;

/// Repositories for one logical request.
///
/// `unit_of_work` is present only when the backing store supports
/// transactions; it never covers repositories served by the document store.
#[derive(Clone)]
pub struct CatalogSession {
    pub products: Arc<dyn Repository<Product>>,
    pub customers: Arc<dyn Repository<Customer>>,
    pub orders: Arc<dyn Repository<Order>>,
    pub unit_of_work: Option<Arc<dyn UnitOfWork>>,
}

/// Chooses the backend at composition time
pub trait SessionFactory: Send + Sync {
    /// Open a fresh session (new tracked context for relational stores)
    fn open_session(&self) -> CatalogSession;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
