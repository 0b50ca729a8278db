// Unit-of-Work Port (relational backends only)

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

/// Explicit transaction control over a request-scoped data context.
///
/// State machine: `Idle -> InTransaction` on begin, back to `Idle` on commit
/// or rollback. Beginning twice, or committing/rolling back while idle, is
/// `AppError::InvalidState`. Every repository call on the same context made
/// while a transaction is open joins it.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin_transaction(&self) -> Result<()>;

    async fn commit_transaction(&self) -> Result<()>;

    async fn rollback_transaction(&self) -> Result<()>;

    async fn in_transaction(&self) -> bool;

    /// Discard an open transaction without waiting (used on unwind).
    /// The backend rolls it back.
    fn abandon(&self);
}

/// Scoped transaction: rolls back on drop unless `commit` was called.
///
/// ```text
/// let scope = TransactionScope::begin(uow).await?;
/// repo.add(order).await?;      // an early return here rolls back
/// scope.commit().await?;
/// ```
pub struct TransactionScope {
    uow: Arc<dyn UnitOfWork>,
    completed: bool,
}

impl TransactionScope {
    pub async fn begin(uow: Arc<dyn UnitOfWork>) -> Result<Self> {
        uow.begin_transaction().await?;
        Ok(Self {
            uow,
            completed: false,
        })
    }

    pub async fn commit(mut self) -> Result<()> {
        self.completed = true;
        self.uow.commit_transaction().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.completed = true;
        self.uow.rollback_transaction().await
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if !self.completed {
            warn!("Transaction scope dropped without commit, rolling back");
            self.uow.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    /// Records calls instead of touching a database
    #[derive(Default)]
    struct RecordingUow {
        open: Mutex<bool>,
        log: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl UnitOfWork for RecordingUow {
        async fn begin_transaction(&self) -> Result<()> {
            let mut open = self.open.lock().unwrap();
            if *open {
                return Err(AppError::InvalidState("already open".into()));
            }
            *open = true;
            self.log.lock().unwrap().push("begin");
            Ok(())
        }

        async fn commit_transaction(&self) -> Result<()> {
            *self.open.lock().unwrap() = false;
            self.log.lock().unwrap().push("commit");
            Ok(())
        }

        async fn rollback_transaction(&self) -> Result<()> {
            *self.open.lock().unwrap() = false;
            self.log.lock().unwrap().push("rollback");
            Ok(())
        }

        async fn in_transaction(&self) -> bool {
            *self.open.lock().unwrap()
        }

        fn abandon(&self) {
            *self.open.lock().unwrap() = false;
            self.log.lock().unwrap().push("abandon");
        }
    }

    #[tokio::test]
    async fn test_scope_commit_does_not_abandon() {
        let uow = Arc::new(RecordingUow::default());
        let scope = TransactionScope::begin(uow.clone()).await.unwrap();
        scope.commit().await.unwrap();

        assert_eq!(*uow.log.lock().unwrap(), vec!["begin", "commit"]);
    }

    #[tokio::test]
    async fn test_scope_drop_abandons() {
        let uow = Arc::new(RecordingUow::default());
        {
            let _scope = TransactionScope::begin(uow.clone()).await.unwrap();
        }

        assert_eq!(*uow.log.lock().unwrap(), vec!["begin", "abandon"]);
        assert!(!uow.in_transaction().await);
    }

    #[tokio::test]
    async fn test_scope_begin_fails_when_open() {
        let uow = Arc::new(RecordingUow::default());
        let _scope = TransactionScope::begin(uow.clone()).await.unwrap();

        let second = TransactionScope::begin(uow.clone()).await;
        assert!(matches!(second, Err(AppError::InvalidState(_))));
    }
}
