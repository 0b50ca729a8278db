//! Unit of work over the relational backend

mod common;

use std::sync::Arc;

use catalog_core::domain::{Order, OrderItem};
use catalog_core::error::AppError;
use catalog_core::port::time_provider::ManualTimeProvider;
use catalog_core::port::{SessionFactory, TransactionScope};
use common::{customer, product, sqlite_factory, START_MILLIS};

async fn factory() -> impl SessionFactory {
    sqlite_factory(Arc::new(ManualTimeProvider::new(START_MILLIS))).await
}

#[tokio::test]
async fn test_commit_makes_all_writes_visible() {
    let factory = factory().await;
    let session = factory.open_session();
    let uow = session.unit_of_work.clone().unwrap();

    let scope = TransactionScope::begin(uow.clone()).await.unwrap();
    assert!(uow.in_transaction().await);
    session.customers.add(customer("c-1", "UK")).await.unwrap();
    session.products.add(product(1)).await.unwrap();
    // Reads inside the transaction see its own writes
    assert_eq!(session.products.count(None).await.unwrap(), 1);
    scope.commit().await.unwrap();
    assert!(!uow.in_transaction().await);

    let fresh = factory.open_session();
    assert!(fresh.customers.get_by_id("c-1").await.unwrap().is_some());
    assert!(fresh.products.get_by_id(&product(1).id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rollback_discards_every_write() {
    let factory = factory().await;
    let session = factory.open_session();
    let uow = session.unit_of_work.clone().unwrap();

    uow.begin_transaction().await.unwrap();
    session.customers.add(customer("c-1", "UK")).await.unwrap();
    session
        .orders
        .add(Order::new(
            "o-1",
            "c-1",
            START_MILLIS,
            vec![OrderItem::new("p-1", "Laptop", 1, 999.0)],
        ))
        .await
        .unwrap();
    uow.rollback_transaction().await.unwrap();

    let fresh = factory.open_session();
    assert!(fresh.customers.get_by_id("c-1").await.unwrap().is_none());
    assert!(fresh.orders.get_by_id("o-1").await.unwrap().is_none());
    assert_eq!(fresh.orders.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_write_inside_scope_rolls_back_earlier_writes() {
    let factory = factory().await;
    factory
        .open_session()
        .products
        .add(product(2))
        .await
        .unwrap();

    let session = factory.open_session();
    let result: Result<(), AppError> = async {
        let scope = TransactionScope::begin(session.unit_of_work.clone().unwrap()).await?;
        session.products.add(product(1)).await?;
        session.products.add(product(2)).await?; // duplicate
        scope.commit().await
    }
    .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let fresh = factory.open_session();
    assert!(fresh.products.get_by_id(&product(1).id).await.unwrap().is_none());
    assert_eq!(fresh.products.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_state_machine_misuse_is_invalid_state() {
    let factory = factory().await;
    let uow = factory.open_session().unit_of_work.unwrap();

    assert!(matches!(
        uow.commit_transaction().await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        uow.rollback_transaction().await,
        Err(AppError::InvalidState(_))
    ));

    uow.begin_transaction().await.unwrap();
    assert!(matches!(
        uow.begin_transaction().await,
        Err(AppError::InvalidState(_))
    ));
    uow.commit_transaction().await.unwrap();
}

#[tokio::test]
async fn test_sessions_do_not_share_contexts() {
    let factory = factory().await;
    let first = factory.open_session();
    let second = factory.open_session();

    first.unit_of_work.clone().unwrap().begin_transaction().await.unwrap();
    assert!(!second.unit_of_work.clone().unwrap().in_transaction().await);
    first.unit_of_work.unwrap().rollback_transaction().await.unwrap();
}

#[tokio::test]
async fn test_document_sessions_have_no_unit_of_work() {
    let backend = common::document_backend().await;
    assert!(backend.sessions.open_session().unit_of_work.is_none());
}
