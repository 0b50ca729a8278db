// Cancellation Signal (watch-channel based)

use std::future::Future;
use tokio::sync::watch;

use crate::error::{AppError, Result};

/// Receiving side of a cancellation signal; cheap to clone
#[derive(Clone, Debug)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// A token that is never cancelled
    pub fn none() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested (never, if the source is gone)
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Sending side
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    /// Signal cancellation to every token
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a cancellation channel
pub fn cancellation_pair() -> (CancellationSource, CancellationToken) {
    let (tx, rx) = watch::channel(false);
    (CancellationSource { tx }, CancellationToken { rx })
}

/// Run a repository call, dropping it and returning `AppError::Cancelled`
/// if the token fires first.
///
/// Dropping the inner future aborts the underlying I/O; an open sqlx
/// transaction owned by it is rolled back.
///
/// ```
/// use catalog_core::port::{cancellable, cancellation_pair};
///
/// tokio_test::block_on(async {
///     let (source, token) = cancellation_pair();
///     source.cancel();
///     let result = cancellable(&token, async { Ok(1) }).await;
///     assert!(result.is_err());
/// });
/// ```
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let mut token = token.clone();
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}
