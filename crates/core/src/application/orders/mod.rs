// Order Service - use cases that span more than one repository

pub mod place;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use place::PlaceOrderRequest;

use crate::domain::{Order, OrderStatus};
use crate::error::Result;
use crate::port::{IdProvider, SessionFactory, TimeProvider};
use std::sync::Arc;

/// Order Service
pub struct OrderService {
    sessions: Arc<dyn SessionFactory>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl OrderService {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            sessions,
            id_provider,
            time_provider,
        }
    }

    /// Place a new order for an existing customer
    pub async fn place(&self, req: PlaceOrderRequest) -> Result<Order> {
        let session = self.sessions.open_session();
        place::execute(
            &session,
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }

    /// Move an order along its lifecycle
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let session = self.sessions.open_session();
        status::execute(&session, order_id, status).await
    }
}
