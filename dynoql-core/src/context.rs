/// Per-call deadline and cancellation for store requests

use crate::error::StoreError;
use crate::store::StoreResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Bounds a store call (or a sequence of calls) by a deadline and an
/// optional cancel signal.
///
/// The deadline is fixed when the timeout is set, so every call made with
/// the same context shares it.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every context created alongside it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_canceled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Attaches a cancel signal and returns the handle that fires it.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx: Arc::new(tx) })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Runs `fut` until it completes, the deadline passes, or the context is
    /// canceled. An abandoned future is dropped.
    pub async fn run<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_canceled() {
            return Err(StoreError::Canceled);
        }

        let guarded = async {
            tokio::select! {
                res = fut => res,
                _ = self.canceled() => Err(StoreError::Canceled),
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or_else(|_| Err(StoreError::Timeout(self.timeout.unwrap_or_default()))),
            None => guarded.await,
        }
    }

    /// Sleeps for `duration`, bounded by this context.
    pub async fn sleep(&self, duration: Duration) -> StoreResult<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    async fn canceled(&self) {
        let Some(rx) = &self.cancel else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without firing: never canceled.
                return std::future::pending().await;
            }
        }
    }
}
