//! Catalog Service - Main Entry Point

mod config;
mod hybrid;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use catalog_core::application::RetryPolicy;
use catalog_core::port::id_provider::UuidProvider;
use catalog_core::port::time_provider::SystemTimeProvider;
use catalog_core::port::{cancellation_pair, SessionFactory, TimeProvider};
use catalog_infra_document::{DocumentClient, DocumentSessionFactory};
use catalog_infra_sqlite::{create_pool, run_migrations, SqliteSessionFactory};

use config::{Backend, LogFormat, Settings};
use hybrid::HybridSessionFactory;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let settings = Settings::from_env()?;

    // 2. Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("catalog=info"))
        .context("Failed to create env filter")?;

    match settings.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Catalog service v{} starting...", VERSION);

    // 3. Build the session factory for the selected backend
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let sessions = build_sessions(&settings, time_provider.clone()).await?;
    info!(backend = sessions.backend(), "Session factory ready");

    // 4. Start JSON-RPC server
    let (shutdown, shutdown_token) = cancellation_pair();
    let handler = RpcHandler::new(
        sessions,
        Arc::new(UuidProvider),
        time_provider,
        shutdown_token,
    );
    let rpc_config = RpcServerConfig {
        host: settings.rpc_host.clone(),
        port: settings.rpc_port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(%addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Cancel in-flight calls, then stop accepting requests
    shutdown.cancel();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");

    Ok(())
}

async fn build_sessions(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<Arc<dyn SessionFactory>> {
    let sessions: Arc<dyn SessionFactory> = match settings.backend {
        Backend::Sqlite => Arc::new(sqlite_sessions(settings, time_provider).await?),
        Backend::Document => Arc::new(document_sessions(settings, time_provider).await?),
        Backend::Hybrid => {
            let documents = document_sessions(settings, time_provider.clone()).await?;
            let relational = sqlite_sessions(settings, time_provider).await?;
            Arc::new(HybridSessionFactory::new(documents, relational))
        }
    };
    Ok(sessions)
}

async fn sqlite_sessions(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<SqliteSessionFactory> {
    if let Some(parent) = settings.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    info!(db_path = %settings.db_path.display(), "Initializing database...");
    let pool = create_pool(&settings.database_url())
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    Ok(SqliteSessionFactory::new(
        pool,
        RetryPolicy::default(),
        time_provider,
    ))
}

async fn document_sessions(
    settings: &Settings,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<DocumentSessionFactory> {
    let client = DocumentClient::default();
    DocumentSessionFactory::connect(&client, &settings.document, time_provider)
        .await
        .map_err(|e| anyhow::anyhow!("Document store setup failed: {}", e))
}
