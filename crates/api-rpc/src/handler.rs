//! RPC Method Handlers
//!
//! One session per call; every call is cut short when the shutdown token
//! fires.

use crate::error::to_rpc_error;
use crate::types::{
    CreateCustomerRequest, CreateProductRequest, DeleteResponse, IdRequest, ListRequest,
    OrdersByCustomerRequest, PageResponse, UpdateCustomerRequest, UpdateOrderStatusRequest,
    UpdateProductRequest,
};
use catalog_core::application::orders::PlaceOrderRequest;
use catalog_core::application::OrderService;
use catalog_core::domain::{Customer, Entity, Order, OrderStatus, Product};
use catalog_core::error::{AppError, Result};
use catalog_core::port::{
    cancellable, CancellationToken, IdProvider, Predicate, Repository, SessionFactory,
    TimeProvider,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::future::Future;
use std::sync::Arc;

type RpcResult<T> = std::result::Result<T, ErrorObjectOwned>;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    sessions: Arc<dyn SessionFactory>,
    orders: OrderService,
    id_provider: Arc<dyn IdProvider>,
    shutdown: CancellationToken,
}

impl RpcHandler {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orders: OrderService::new(sessions.clone(), id_provider.clone(), time_provider),
            sessions,
            id_provider,
            shutdown,
        }
    }

    async fn run<T, F>(&self, fut: F) -> RpcResult<T>
    where
        F: Future<Output = Result<T>>,
    {
        cancellable(&self.shutdown, fut).await.map_err(to_rpc_error)
    }

    // ---- products ----

    /// catalog.products.create.v1
    pub async fn create_product(&self, req: CreateProductRequest) -> RpcResult<Product> {
        let mut product = Product::new(self.id_provider.generate_id(), req.name, req.price, req.category)
            .with_stock(req.stock_quantity);
        product.description = req.description;

        let session = self.sessions.open_session();
        self.run(session.products.add(product)).await
    }

    /// catalog.products.get.v1
    pub async fn get_product(&self, req: IdRequest) -> RpcResult<Product> {
        let session = self.sessions.open_session();
        self.run(require(session.products.as_ref(), &req.id)).await
    }

    /// catalog.products.list.v1
    pub async fn list_products(&self, req: ListRequest) -> RpcResult<PageResponse<Product>> {
        let session = self.sessions.open_session();
        self.run(list(session.products.as_ref(), req, "category")).await
    }

    /// catalog.products.update.v1
    pub async fn update_product(&self, req: UpdateProductRequest) -> RpcResult<Product> {
        let session = self.sessions.open_session();
        self.run(async {
            let mut product = require(session.products.as_ref(), &req.id).await?;
            if let Some(name) = req.name {
                product.name = name;
            }
            if let Some(description) = req.description {
                product.description = Some(description);
            }
            if let Some(price) = req.price {
                product.price = price;
            }
            if let Some(category) = req.category {
                product.category = category;
            }
            if let Some(stock_quantity) = req.stock_quantity {
                product.stock_quantity = stock_quantity;
            }
            session.products.update(product).await
        })
        .await
    }

    /// catalog.products.delete.v1
    pub async fn delete_product(&self, req: IdRequest) -> RpcResult<DeleteResponse> {
        let session = self.sessions.open_session();
        let deleted = self.run(session.products.delete(&req.id)).await?;
        Ok(DeleteResponse {
            id: req.id,
            deleted,
        })
    }

    // ---- customers ----

    /// catalog.customers.create.v1
    pub async fn create_customer(&self, req: CreateCustomerRequest) -> RpcResult<Customer> {
        let mut customer = Customer::new(
            self.id_provider.generate_id(),
            req.first_name,
            req.last_name,
            req.email,
            req.country,
        );
        customer.phone = req.phone;

        let session = self.sessions.open_session();
        self.run(session.customers.add(customer)).await
    }

    /// catalog.customers.get.v1
    pub async fn get_customer(&self, req: IdRequest) -> RpcResult<Customer> {
        let session = self.sessions.open_session();
        self.run(require(session.customers.as_ref(), &req.id)).await
    }

    /// catalog.customers.list.v1
    pub async fn list_customers(&self, req: ListRequest) -> RpcResult<PageResponse<Customer>> {
        let session = self.sessions.open_session();
        self.run(list(session.customers.as_ref(), req, "country")).await
    }

    /// catalog.customers.update.v1
    pub async fn update_customer(&self, req: UpdateCustomerRequest) -> RpcResult<Customer> {
        let session = self.sessions.open_session();
        self.run(async {
            let mut customer = require(session.customers.as_ref(), &req.id).await?;
            if let Some(first_name) = req.first_name {
                customer.first_name = first_name;
            }
            if let Some(last_name) = req.last_name {
                customer.last_name = last_name;
            }
            if let Some(email) = req.email {
                customer.email = email;
            }
            if let Some(phone) = req.phone {
                customer.phone = Some(phone);
            }
            if let Some(country) = req.country {
                customer.country = country;
            }
            session.customers.update(customer).await
        })
        .await
    }

    /// catalog.customers.delete.v1
    pub async fn delete_customer(&self, req: IdRequest) -> RpcResult<DeleteResponse> {
        let session = self.sessions.open_session();
        let deleted = self.run(session.customers.delete(&req.id)).await?;
        Ok(DeleteResponse {
            id: req.id,
            deleted,
        })
    }

    // ---- orders ----

    /// catalog.orders.create.v1
    pub async fn create_order(&self, req: PlaceOrderRequest) -> RpcResult<Order> {
        self.run(self.orders.place(req)).await
    }

    /// catalog.orders.get.v1
    pub async fn get_order(&self, req: IdRequest) -> RpcResult<Order> {
        let session = self.sessions.open_session();
        self.run(require(session.orders.as_ref(), &req.id)).await
    }

    /// catalog.orders.list.v1
    pub async fn list_orders(&self, req: ListRequest) -> RpcResult<PageResponse<Order>> {
        let session = self.sessions.open_session();
        self.run(list(session.orders.as_ref(), req, "status")).await
    }

    /// catalog.orders.update.v1
    pub async fn update_order_status(&self, req: UpdateOrderStatusRequest) -> RpcResult<Order> {
        self.run(async {
            let status = req.status.parse::<OrderStatus>()?;
            self.orders.set_status(&req.id, status).await
        })
        .await
    }

    /// catalog.orders.delete.v1
    pub async fn delete_order(&self, req: IdRequest) -> RpcResult<DeleteResponse> {
        let session = self.sessions.open_session();
        let deleted = self.run(session.orders.delete(&req.id)).await?;
        Ok(DeleteResponse {
            id: req.id,
            deleted,
        })
    }

    /// catalog.orders.by_customer.v1
    pub async fn orders_by_customer(&self, req: OrdersByCustomerRequest) -> RpcResult<Vec<Order>> {
        let session = self.sessions.open_session();
        self.run(session.orders.find(&Predicate::eq("customerId", req.customer_id)))
            .await
    }
}

/// Point lookup where absence is an error
async fn require<T: Entity>(repo: &dyn Repository<T>, id: &str) -> Result<T> {
    repo.get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::KIND, id)))
}

async fn list<T: Entity>(repo: &dyn Repository<T>, req: ListRequest, filter_field: &str) -> Result<PageResponse<T>> {
    let predicate = req.filter.map(|value| Predicate::eq(filter_field, value));
    let page = repo
        .get_paged(req.page, req.page_size, predicate.as_ref())
        .await?;
    Ok(page.into())
}
