//! Daemon configuration, read once from `CATALOG_*` environment variables

use anyhow::{anyhow, bail, Context, Result};
use catalog_infra_document::DocumentStoreSettings;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;
const DB_FILE_NAME: &str = "catalog.db";

/// Which store serves the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Document,
    /// Products in the document store, customers and orders in SQLite
    Hybrid,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "document" => Ok(Self::Document),
            "hybrid" => Ok(Self::Hybrid),
            other => bail!("unknown backend '{}' (expected sqlite, document or hybrid)", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: Backend,
    pub db_path: PathBuf,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub document: DocumentStoreSettings,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("CATALOG_BACKEND") {
            Some(value) => value.parse()?,
            None => Backend::Sqlite,
        };

        let db_path = match lookup("CATALOG_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let rpc_port = match lookup("CATALOG_RPC_PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("CATALOG_RPC_PORT is not a port: {}", port))?,
            None => DEFAULT_RPC_PORT,
        };

        let defaults = DocumentStoreSettings::default();
        let throughput = match lookup("CATALOG_DOC_THROUGHPUT") {
            Some(ru) => ru
                .parse()
                .with_context(|| format!("CATALOG_DOC_THROUGHPUT is not a number: {}", ru))?,
            None => defaults.throughput,
        };
        let document = DocumentStoreSettings {
            database: lookup("CATALOG_DOC_DATABASE").unwrap_or(defaults.database),
            throughput,
            products_partition_key: lookup("CATALOG_PRODUCTS_PARTITION_KEY")
                .unwrap_or(defaults.products_partition_key),
            customers_partition_key: lookup("CATALOG_CUSTOMERS_PARTITION_KEY")
                .unwrap_or(defaults.customers_partition_key),
            orders_partition_key: lookup("CATALOG_ORDERS_PARTITION_KEY")
                .unwrap_or(defaults.orders_partition_key),
        };

        let log_format = match lookup("CATALOG_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            backend,
            db_path,
            rpc_host: lookup("CATALOG_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port,
            document,
            log_format,
        })
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "catalog")
        .ok_or_else(|| anyhow!("no home directory; set CATALOG_DB_PATH"))?;
    Ok(dirs.data_dir().join(DB_FILE_NAME))
}
