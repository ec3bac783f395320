//! Per-provider dispatch queue.
//!
//! Admission is FIFO: a fair async mutex guards the interval window, and a
//! semaphore bounds in-flight requests. A caller that is dropped while
//! waiting simply leaves the queue.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use super::types::ProviderLimits;

struct Window {
    start: Instant,
    dispatched: u32,
}

/// Dispatch queue for a single provider key.
pub struct ProviderQueue {
    limits: ProviderLimits,
    window: Mutex<Window>,
    concurrency: Arc<Semaphore>,
}

impl ProviderQueue {
    pub fn new(limits: ProviderLimits) -> Self {
        Self {
            limits,
            window: Mutex::new(Window {
                start: Instant::now(),
                dispatched: 0,
            }),
            concurrency: Arc::new(Semaphore::new(limits.concurrency as usize)),
        }
    }

    pub fn limits(&self) -> ProviderLimits {
        self.limits
    }

    /// Wait until both the interval window and the concurrency budget allow a
    /// dispatch. The returned permit must be held for the duration of the
    /// request.
    pub async fn admit(&self) -> OwnedSemaphorePermit {
        let permit = self
            .concurrency
            .clone()
            .acquire_owned()
            .await
            .expect("gateway semaphore closed");

        // The window lock is held across the sleep so waiters drain in
        // arrival order.
        let mut window = self.window.lock().await;
        loop {
            let now = Instant::now();
            if now.duration_since(window.start) >= self.limits.interval {
                window.start = now;
                window.dispatched = 0;
            }
            if window.dispatched < self.limits.interval_cap {
                window.dispatched += 1;
                return permit;
            }
            let next_window = window.start + self.limits.interval;
            tokio::time::sleep_until(next_window).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn limits(interval_ms: u64, cap: u32, concurrency: u32) -> ProviderLimits {
        ProviderLimits {
            interval: Duration::from_millis(interval_ms),
            interval_cap: cap,
            concurrency,
            timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_serial_provider_spaces_dispatches() {
        // interval 1s, cap 1: ten concurrent requests take at least 9s of
        // (virtual) wall time, at most one dispatch per window.
        let queue = Arc::new(ProviderQueue::new(limits(1000, 1, 10)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let _permit = queue.admit().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_cap_allows_bursts_within_window() {
        // cap 3 per 1s window: ten requests need four windows, so three full
        // waits.
        let queue = Arc::new(ProviderQueue::new(limits(1000, 3, 10)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                let _permit = queue.admit().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_budget_is_enforced() {
        let queue = Arc::new(ProviderQueue::new(limits(1, 100, 2)));
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = queue.admit().await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_leaves_queue() {
        let queue = Arc::new(ProviderQueue::new(limits(1000, 1, 1)));

        // Occupy the current window.
        let _first = queue.admit().await;

        let queue2 = Arc::clone(&queue);
        let waiting = tokio::spawn(async move {
            let _permit = queue2.admit().await;
        });
        // Cancel the waiter before it is admitted.
        waiting.abort();
        assert!(waiting.await.is_err());

        // The queue still admits new callers in the next window.
        drop(_first);
        let start = Instant::now();
        let _second = queue.admit().await;
        assert!(start.elapsed() <= Duration::from_secs(2));
    }
}
