//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 surface over the catalog repositories:
//! each method opens one session and maps errors to RPC codes.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
