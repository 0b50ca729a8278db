// Catalog Infrastructure - SQLite Adapter
// Implements: Repository<T> for every entity, UnitOfWork, SessionFactory

mod connection;
mod context;
mod error;
mod migration;
mod repository;
mod session;
mod statement;
mod table;
mod transaction;

pub use connection::create_pool;
pub use context::SqliteDataContext;
pub use error::{is_transient, map_sqlx_error};
pub use migration::run_migrations;
pub use repository::SqliteRepository;
pub use session::SqliteSessionFactory;
pub use statement::{SqlStatement, SqlValue};
pub use table::SqlTable;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
