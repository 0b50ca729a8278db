// Order Status Use Case

use crate::domain::{Order, OrderStatus};
use crate::error::{AppError, Result};
use crate::port::CatalogSession;
use tracing::info;

/// Load, transition and save an order
pub async fn execute(session: &CatalogSession, order_id: &str, next: OrderStatus) -> Result<Order> {
    let mut order = session
        .orders
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

    let from = order.status;
    order.transition_to(next)?;
    let saved = session.orders.update(order).await?;

    info!(order_id, from = %from, to = %next, "Order status changed");
    Ok(saved)
}
