use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::time::{Duration, Instant};

use usermetric_core::StoreError;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Deadline + cancellation for one inbound request.
///
/// Cancellation fires when the paired [`CancelGuard`] is dropped, which is what
/// happens to the handler future when the client goes away.
#[derive(Debug, Clone)]
pub struct RequestCtx {
    id: u64,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<()>>,
}

/// Keeps a [`RequestCtx`] alive; dropping it cancels the context.
#[derive(Debug)]
pub struct CancelGuard {
    _tx: watch::Sender<()>,
}

impl CancelGuard {
    pub fn cancel(self) {}
}

impl RequestCtx {
    /// Context for one request, optionally bounded by `timeout`.
    pub fn new(timeout: Option<Duration>) -> (Self, CancelGuard) {
        let (tx, rx) = watch::channel(());
        let ctx = Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            deadline: timeout.map(|t| Instant::now() + t),
            cancel: Some(rx),
        };
        (ctx, CancelGuard { _tx: tx })
    }

    /// Context with no deadline that is never cancelled (startup, seeding, tests).
    pub fn background() -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            deadline: None,
            cancel: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check for synchronous backends.
    pub fn check(&self) -> Result<(), StoreError> {
        if let Some(rx) = &self.cancel {
            if rx.has_changed().is_err() {
                return Err(StoreError::Cancelled);
            }
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the request is cancelled; pending forever for background contexts.
    pub async fn cancelled(&self) {
        match &self.cancel {
            Some(rx) => {
                let mut rx = rx.clone();
                while rx.changed().await.is_ok() {}
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Run a store operation under this context's deadline and cancellation.
    pub async fn run<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<StoreError>,
    {
        self.check()?;
        let expired = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            res = op => res,
            _ = expired => Err(StoreError::DeadlineExceeded.into()),
            _ = self.cancelled() => Err(StoreError::Cancelled.into()),
        }
    }
}
