//! Caller-driven abort signal.
//!
//! An [`AbortHandle`] is created by whoever owns the operation (the CLI wires
//! it to Ctrl+C and `--timeout`) and cloned into every session. Each HTTP call
//! made on a session races the handle, so an abort surfaces as a
//! [`ProviderErrorCode::Cancelled`](crate::ProviderErrorCode::Cancelled) error
//! wherever the chain currently is.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ProviderError, ProviderResult};

/// A cloneable handle for triggering or observing an abort.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signals every clone of this handle.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the handle is aborted.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone: nobody can abort any more.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Returns a cancelled error if the handle is already aborted.
    pub fn check(&self, what: &str) -> ProviderResult<()> {
        if self.is_aborted() {
            Err(ProviderError::cancelled(format!("aborted before {}", what)))
        } else {
            Ok(())
        }
    }

    /// Runs `fut` unless the handle is aborted first.
    pub async fn guard<T, F>(&self, what: &str, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.aborted() => Err(ProviderError::cancelled(format!("aborted during {}", what))),
            result = fut => result,
        }
    }

    /// Sleeps for `delay` unless the handle is aborted first.
    pub async fn sleep(&self, delay: std::time::Duration) -> ProviderResult<()> {
        self.guard("backoff", async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use std::time::Duration;

    #[tokio::test]
    async fn abort_is_seen_by_clones() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_aborted());
        handle.abort();
        assert!(clone.is_aborted());
        assert!(clone.check("login").is_err());
    }

    #[tokio::test]
    async fn guard_returns_cancelled_when_aborted_mid_flight() {
        let handle = AbortHandle::new();
        let trigger = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.abort();
        });

        let result: ProviderResult<()> = handle
            .guard("confirm", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result.unwrap_err().code(), ProviderErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn guard_passes_through_when_not_aborted() {
        let handle = AbortHandle::new();
        let result = handle.guard("fetch", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
