//! Admission control for outbound requests.
//!
//! A [`PermitGate`] bounds how many gated calls are in flight at once.
//! Permits are handed out first-come first-served and are returned when the
//! [`PermitGuard`] is dropped, so every exit path (success, error, panic,
//! cancellation of the owning future) releases exactly once.
//!
//! A caller cancelled while still waiting for a permit consumes nothing.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::errors::UpstreamError;

/// Shared permit pool. Cloning is cheap and clones share the same pool.
#[derive(Clone, Debug)]
pub struct PermitGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held permit. Dropping it returns the permit to the gate.
#[derive(Debug)]
pub struct PermitGuard {
    _permit: OwnedSemaphorePermit,
}

impl PermitGate {
    /// Create a gate with `capacity` permits. A capacity of zero would
    /// block every caller forever and is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            warn!("Permit gate capacity 0 is not usable, using 1");
            1
        } else {
            capacity
        };

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a permit.
    ///
    /// Waiters are served in the order they started waiting. Fails only when
    /// the gate has been [closed](Self::close).
    pub async fn acquire(&self) -> Result<PermitGuard, UpstreamError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| UpstreamError::GateClosed)?;
        Ok(PermitGuard { _permit: permit })
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Result<Option<PermitGuard>, UpstreamError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(Some(PermitGuard { _permit: permit })),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => Err(UpstreamError::GateClosed),
        }
    }

    /// Run `call` while holding a permit.
    ///
    /// The permit is taken before `call` is first polled and released once
    /// it has produced its output, or when the returned future is dropped.
    pub async fn run<F, T>(&self, call: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let _permit = self.acquire().await?;
        debug!(
            "Permit acquired, {} of {} still available",
            self.available_permits(),
            self.capacity
        );
        call.await
    }

    /// Point-in-time count of free permits. Observational only.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available_permits())
    }

    /// Stop handing out permits. Pending and future waiters fail with
    /// [`UpstreamError::GateClosed`]; permits already held stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_permits_return_on_drop() {
        let gate = PermitGate::new(2);

        let first = gate.acquire().await.unwrap();
        let second = gate.acquire().await.unwrap();
        assert_eq!(gate.available_permits(), 0);
        assert_eq!(gate.in_flight(), 2);
        assert!(gate.try_acquire().unwrap().is_none());

        drop(first);
        assert_eq!(gate.available_permits(), 1);
        drop(second);
        assert_eq!(gate.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let gate = PermitGate::new(0);
        assert_eq!(gate.capacity(), 1);
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_run_releases_on_error() {
        let gate = PermitGate::new(1);

        let result: Result<(), _> = gate
            .run(async {
                Err(UpstreamError::Timeout {
                    provider: "KUDAGO".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_wait_consumes_nothing() {
        let gate = PermitGate::new(1);
        let held = gate.acquire().await.unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(20), gate.acquire()).await;
        assert!(waited.is_err());
        assert_eq!(gate.available_permits(), 0);

        drop(held);
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_releases_held_permit() {
        let gate = PermitGate::new(1);

        let call = gate.run(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        let outcome = tokio::time::timeout(Duration::from_millis(20), call).await;

        assert!(outcome.is_err());
        assert_eq!(gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_waiters_served_in_arrival_order() {
        let gate = PermitGate::new(1);
        let held = gate.acquire().await.unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // Let the waiter enqueue before spawning the next one
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_capacity() {
        let gate = PermitGate::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let gate = gate.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                gate.run(async {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.available_permits(), 3);
    }

    #[tokio::test]
    async fn test_closed_gate_rejects_waiters() {
        let gate = PermitGate::new(1);
        let held = gate.acquire().await.unwrap();

        gate.close();
        assert!(gate.is_closed());
        assert_eq!(gate.acquire().await.unwrap_err(), UpstreamError::GateClosed);
        assert!(gate.try_acquire().is_err());

        drop(held);
    }
}
