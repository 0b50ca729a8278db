// Port Layer - Interfaces the adapters implement

pub mod cancellation;
pub mod id_provider; // For deterministic testing
pub mod query;
pub mod repository;
pub mod session;
pub mod time_provider;
pub mod unit_of_work;

// Re-exports
pub use cancellation::{cancellable, cancellation_pair, CancellationSource, CancellationToken};
pub use id_provider::IdProvider;
pub use query::{page_query, CompareOp, Page, Predicate, Query, SortDirection, SortKey};
pub use repository::{ensure_valid, Repository};
pub use session::{CatalogSession, SessionFactory};
pub use time_provider::TimeProvider;
pub use unit_of_work::{TransactionScope, UnitOfWork};
