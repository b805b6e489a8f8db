//! Bounded worker pool with first-error cancellation
//!
//! Every flow pushes its units of work through a [`WorkerPool`]: each unit
//! waits for one of a fixed number of slots, checks the shared cancellation
//! signal, then races its operation against that signal. The first unit to
//! fail with a real error cancels the rest; the pool reports that error
//! after all units have settled.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::domain::{Result, SyncError};

/// Shared cancellation signal.
///
/// Cloning is cheap; all clones observe the same flag. Once set it never
/// resets.
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Trip the signal, waking every waiter.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the signal is tripped. Pends forever otherwise, which
    /// makes it safe to race against an operation in `select!`.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-width task pool.
///
/// Units acquire a semaphore slot before their operation runs, so at most
/// `limit` operations are in flight at once. A unit still queued when the
/// pool is cancelled resolves to [`SyncError::Cancelled`] without running;
/// a unit already in flight is dropped at its next suspension point.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    cancel: CancelToken,
    tasks: JoinSet<Result<()>>,
}

impl WorkerPool {
    pub fn new(limit: usize) -> Self {
        Self::with_cancel(limit, CancelToken::new())
    }

    /// Pool sharing an externally owned cancellation signal.
    pub fn with_cancel(limit: usize, cancel: CancelToken) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            cancel,
            tasks: JoinSet::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Queue one unit of work.
    pub fn spawn<F>(&mut self, unit: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| SyncError::Cancelled)?;
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            tokio::select! {
                _ = cancel.cancelled() => Err(SyncError::Cancelled),
                outcome = unit => outcome,
            }
        });
    }

    /// Wait for every unit to settle.
    ///
    /// The first non-cancellation error trips the cancel signal and becomes
    /// the pool result; cancellation markers from the remaining units are
    /// swallowed.
    pub async fn join(mut self) -> Result<()> {
        let mut first_error: Option<SyncError> = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => Err(SyncError::Other(format!(
                    "worker task failed: {join_error}"
                ))),
            };
            if let Err(err) = outcome {
                if err.is_cancelled() {
                    continue;
                }
                if first_error.is_none() {
                    self.cancel.cancel();
                    first_error = Some(err);
                } else {
                    tracing::debug!(error = %err, "Worker error after cancellation");
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_pool_runs_every_unit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(3);
        for _ in 0..10 {
            let counter = counter.clone();
            pool.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        pool.join().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_pool_bounds_in_flight_units() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2);
        for _ in 0..8 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            pool.spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        pool.join().await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_first_error_cancels_remaining_units() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(4);
        pool.spawn(async move { Err(SyncError::Validation("unit failed".to_string())) });
        for _ in 0..9 {
            let completed = completed.clone();
            pool.spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = pool.join().await.unwrap_err();

        assert!(matches!(err, SyncError::Validation(_)));
        // In-flight sleepers are dropped mid-sleep; at most the units that
        // finished before the failure could have completed.
        assert!(completed.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_units_spawned_after_cancel_do_not_run() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(4);
        pool.cancel_token().cancel();
        for _ in 0..5 {
            let ran = ran.clone();
            pool.spawn(async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        pool.join().await.unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_token_wakes_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_tripped() {
        let token = CancelToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already-cancelled token should resolve at once");
    }
}
