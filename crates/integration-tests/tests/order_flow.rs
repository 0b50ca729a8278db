//! Placing and progressing orders through the application service

mod common;

use std::sync::Arc;

use catalog_core::application::orders::PlaceOrderRequest;
use catalog_core::application::OrderService;
use catalog_core::domain::{OrderItem, OrderStatus};
use catalog_core::error::AppError;
use catalog_core::port::id_provider::SequentialIdProvider;
use catalog_core::port::Predicate;
use common::{backends, customer, Backend};

fn service(backend: &Backend) -> OrderService {
    OrderService::new(
        backend.sessions.clone(),
        Arc::new(SequentialIdProvider::new("order")),
        backend.clock.clone(),
    )
}

fn request(customer_id: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        customer_id: customer_id.to_string(),
        items: vec![
            OrderItem::new("p-1", "Laptop", 1, 999.0),
            OrderItem::new("p-2", "Mouse", 2, 25.0),
        ],
    }
}

#[tokio::test]
async fn test_place_order_for_existing_customer() {
    for backend in backends().await {
        let session = backend.sessions.open_session();
        session.customers.add(customer("c-1", "UK")).await.unwrap();

        let order = service(&backend).place(request("c-1")).await.unwrap();
        assert_eq!(order.id, "order-1", "{}", backend.name);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 1_049.0);
        assert_eq!(order.order_date, common::START_MILLIS);

        let stored = backend
            .sessions
            .open_session()
            .orders
            .get_by_id("order-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.items.len(), 2);
    }
}

#[tokio::test]
async fn test_place_order_for_unknown_customer_writes_nothing() {
    for backend in backends().await {
        let err = service(&backend).place(request("ghost")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "{}", backend.name);

        let orders = backend.sessions.open_session().orders;
        assert_eq!(orders.count(None).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn test_place_order_rejects_bad_requests() {
    for backend in backends().await {
        let service = service(&backend);

        let mut empty = request("c-1");
        empty.items.clear();
        assert!(matches!(
            service.place(empty).await,
            Err(AppError::InvalidArgument(_))
        ));

        let mut zero = request("c-1");
        zero.items[0].quantity = 0;
        assert!(matches!(
            service.place(zero).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}

#[tokio::test]
async fn test_status_lifecycle() {
    for backend in backends().await {
        backend
            .sessions
            .open_session()
            .customers
            .add(customer("c-1", "UK"))
            .await
            .unwrap();
        let service = service(&backend);
        let order = service.place(request("c-1")).await.unwrap();

        backend.clock.advance(1_000);
        let confirmed = service.set_status(&order.id, OrderStatus::Confirmed).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert!(confirmed.updated_at.is_some(), "{}", backend.name);

        let err = service
            .set_status(&order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(_)), "{}", backend.name);

        let err = service
            .set_status("missing", OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let confirmed_orders = backend
            .sessions
            .open_session()
            .orders
            .find(&Predicate::eq("status", "Confirmed"))
            .await
            .unwrap();
        assert_eq!(confirmed_orders.len(), 1);
    }
}
