// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Serialized critical sections over async work
//!
//! Callers acquire an [`AsyncLockGuard`] and hold it across `.await`s.
//! Ownership is handed out in FIFO order and released when the guard drops,
//! which covers early returns, `?` propagation and panics alike.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone)]
pub struct AsyncLock {
    name: Arc<str>,
    inner: Arc<Mutex<()>>,
    waiting: Arc<AtomicUsize>,
}

/// Ownership token for an [`AsyncLock`]
pub struct AsyncLockGuard {
    name: Arc<str>,
    _guard: OwnedMutexGuard<()>,
}

impl AsyncLock {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(())),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for ownership of the lock
    ///
    /// Dropping the returned future before it completes withdraws the caller
    /// from the queue.
    pub async fn lock(&self) -> AsyncLockGuard {
        let waiting = WaitingSlot::enter(&self.waiting);
        let guard = self.inner.clone().lock_owned().await;
        drop(waiting);
        tracing::trace!(lock = %self.name, "acquired");
        AsyncLockGuard {
            name: self.name.clone(),
            _guard: guard,
        }
    }

    /// Run `operation` while holding the lock
    pub async fn run<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock().await;
        operation().await
    }

    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Number of callers currently waiting for ownership
    pub fn waiters(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

/// One entry in the waiter count, removed on drop
struct WaitingSlot<'a>(&'a AtomicUsize);

impl<'a> WaitingSlot<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self(waiting)
    }
}

impl Drop for WaitingSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for AsyncLockGuard {
    fn drop(&mut self) {
        tracing::trace!(lock = %self.name, "released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sections_do_not_overlap() {
        let lock = AsyncLock::new("launch");
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                lock.run(|| async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_ownership_is_fifo() {
        let lock = AsyncLock::new("fifo");
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = lock.lock().await;
        let mut handles = Vec::new();
        for i in 0..4 {
            let task_lock = lock.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _guard = task_lock.lock().await;
                order.lock().unwrap().push(i);
            }));
            // Let the task enqueue before spawning the next one
            while lock.waiters() < i + 1 {
                tokio::task::yield_now().await;
            }
        }
        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_abandoned_wait_leaves_queue() {
        let lock = AsyncLock::new("timeout");
        let held = lock.lock().await;

        let attempt = tokio::time::timeout(Duration::from_millis(5), lock.lock()).await;
        assert!(attempt.is_err());
        assert_eq!(lock.waiters(), 0);

        let waiter = tokio::spawn({
            let lock = lock.clone();
            async move {
                let _guard = lock.lock().await;
            }
        });
        while lock.waiters() < 1 {
            tokio::task::yield_now().await;
        }
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(lock.waiters(), 0);

        drop(held);
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_released_on_error_path() {
        let lock = AsyncLock::new("errors");

        let result: Result<(), &str> = lock.run(|| async { Err("creation failed") }).await;
        assert!(result.is_err());
        assert!(!lock.is_locked());

        let guard = lock.lock().await;
        assert!(lock.is_locked());
        drop(guard);
        assert!(!lock.is_locked());
    }
}
