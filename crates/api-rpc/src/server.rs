//! JSON-RPC Server
//!
//! Serves the `catalog.*.v1` methods over HTTP/WebSocket on TCP.

use crate::handler::RpcHandler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// All method registrations, separated from the transport for testing
    pub fn into_module(self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());
        let h = &self.handler;

        // Products
        register(&mut module, "catalog.products.create.v1", h, |h, req| async move {
            h.create_product(req).await
        })?;
        register(&mut module, "catalog.products.get.v1", h, |h, req| async move {
            h.get_product(req).await
        })?;
        register(&mut module, "catalog.products.list.v1", h, |h, req| async move {
            h.list_products(req).await
        })?;
        register(&mut module, "catalog.products.update.v1", h, |h, req| async move {
            h.update_product(req).await
        })?;
        register(&mut module, "catalog.products.delete.v1", h, |h, req| async move {
            h.delete_product(req).await
        })?;

        // Customers
        register(&mut module, "catalog.customers.create.v1", h, |h, req| async move {
            h.create_customer(req).await
        })?;
        register(&mut module, "catalog.customers.get.v1", h, |h, req| async move {
            h.get_customer(req).await
        })?;
        register(&mut module, "catalog.customers.list.v1", h, |h, req| async move {
            h.list_customers(req).await
        })?;
        register(&mut module, "catalog.customers.update.v1", h, |h, req| async move {
            h.update_customer(req).await
        })?;
        register(&mut module, "catalog.customers.delete.v1", h, |h, req| async move {
            h.delete_customer(req).await
        })?;

        // Orders
        register(&mut module, "catalog.orders.create.v1", h, |h, req| async move {
            h.create_order(req).await
        })?;
        register(&mut module, "catalog.orders.get.v1", h, |h, req| async move {
            h.get_order(req).await
        })?;
        register(&mut module, "catalog.orders.list.v1", h, |h, req| async move {
            h.list_orders(req).await
        })?;
        register(&mut module, "catalog.orders.update.v1", h, |h, req| async move {
            h.update_order_status(req).await
        })?;
        register(&mut module, "catalog.orders.delete.v1", h, |h, req| async move {
            h.delete_order(req).await
        })?;
        register(&mut module, "catalog.orders.by_customer.v1", h, |h, req| async move {
            h.orders_by_customer(req).await
        })?;

        Ok(module)
    }

    /// Bind and start serving; returns the bound address with the handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.into_module()?;
        let handle = server.start(module);

        info!(%local_addr, "JSON-RPC server started successfully");
        Ok((local_addr, handle))
    }
}

/// Register one method: parse params, call the handler
fn register<Req, Resp, F, Fut>(
    module: &mut RpcModule<()>,
    method: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<(), String>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module
        .register_async_method(method, move |params, _, _| {
            let handler = handler.clone();
            let call = call.clone();
            async move {
                let req: Req = params.parse()?;
                call(handler, req).await
            }
        })
        .map_err(|e| e.to_string())?;
    Ok(())
}
