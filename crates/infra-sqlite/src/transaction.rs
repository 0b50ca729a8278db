// SQLite Unit-of-Work Implementation

use async_trait::async_trait;
use catalog_core::error::{AppError, Result};
use catalog_core::port::UnitOfWork;
use tracing::{debug, warn};

use crate::context::SqliteDataContext;
use crate::error::map_sqlx_error;

#[async_trait]
impl UnitOfWork for SqliteDataContext {
    async fn begin_transaction(&self) -> Result<()> {
        let mut guard = self.tx.lock().await;
        if guard.is_some() {
            return Err(AppError::InvalidState(
                "a transaction is already in progress".to_string(),
            ));
        }

        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        *guard = Some(tx);
        debug!("Transaction started");
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or_else(|| {
            AppError::InvalidState("no transaction in progress to commit".to_string())
        })?;

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or_else(|| {
            AppError::InvalidState("no transaction in progress to roll back".to_string())
        })?;

        // Tracked snapshots may hold rows that never reached the database
        self.clear_tracked();
        tx.rollback().await.map_err(map_sqlx_error)?;
        debug!("Transaction rolled back");
        Ok(())
    }

    async fn in_transaction(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    fn abandon(&self) {
        match self.tx.try_lock() {
            Ok(mut guard) => {
                // sqlx rolls back a dropped transaction on its connection
                if guard.take().is_some() {
                    self.clear_tracked();
                }
            }
            Err(_) => warn!("Transaction busy, cannot abandon; it rolls back when the context drops"),
        }
    }
}
