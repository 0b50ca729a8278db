// Place Order Use Case

use crate::domain::{Entity, Order, OrderItem};
use crate::error::{AppError, Result};
use crate::port::{CatalogSession, IdProvider, TimeProvider, TransactionScope};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Maximum number of line items accepted in one order
pub const MAX_ITEMS_PER_ORDER: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
}

/// Reject requests that can never produce a valid order
pub fn validate_request(req: &PlaceOrderRequest) -> Result<()> {
    if req.customer_id.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "customerId cannot be empty".to_string(),
        ));
    }
    if req.items.is_empty() {
        return Err(AppError::InvalidArgument(
            "an order needs at least one item".to_string(),
        ));
    }
    if req.items.len() > MAX_ITEMS_PER_ORDER {
        return Err(AppError::InvalidArgument(format!(
            "too many items: {} (max {})",
            req.items.len(),
            MAX_ITEMS_PER_ORDER
        )));
    }
    for item in &req.items {
        if item.quantity <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(AppError::InvalidArgument(format!(
                "unitPrice for product {} must be non-negative",
                item.product_id
            )));
        }
    }
    Ok(())
}

/// Execute place-order use case.
///
/// The customer check and the insert share one transaction when the
/// session's store supports it, so an early return rolls everything back.
/// The document store has no transaction; there the check is best effort.
pub async fn execute(
    session: &CatalogSession,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: PlaceOrderRequest,
) -> Result<Order> {
    validate_request(&req)?;

    let scope = match &session.unit_of_work {
        Some(uow) => Some(TransactionScope::begin(uow.clone()).await?),
        None => None,
    };

    if session.customers.get_by_id(&req.customer_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Customer {} not found",
            req.customer_id
        )));
    }

    let order = Order::new(
        id_provider.generate_id(),
        req.customer_id,
        time_provider.now_millis(),
        req.items,
    );
    let stored = session.orders.add(order).await?;

    if let Some(scope) = scope {
        scope.commit().await?;
    }

    info!(
        order_id = %stored.id(),
        customer_id = %stored.customer_id,
        items = stored.items.len(),
        total = stored.total_amount,
        "Order placed"
    );

    Ok(stored)
}
