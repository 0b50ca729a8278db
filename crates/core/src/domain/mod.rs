// Domain Layer - Entities and their invariants

pub mod customer;
pub mod entity;
pub mod error;
pub mod order;
pub mod product;

// Re-exports
pub use customer::Customer;
pub use entity::{Entity, EntityId};
pub use error::DomainError;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::Product;
