// Application Layer - Use Cases

pub mod orders;
pub mod retry;

// Re-exports
pub use orders::OrderService;
pub use retry::{RetryDecision, RetryPolicy};
