//! Minimum-interval request throttle.
//!
//! Each call waits until `min_interval` has passed since the previous call
//! *started*, then starts. The start timestamp is recorded when the wrapped
//! operation is actually released, so a burst is spaced evenly instead of
//! accumulating drift. Waiters hold a fair (FIFO) async mutex, so calls
//! start in the order they arrived.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

const MIN_INTERVAL_FLOOR: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    /// A zero interval is raised to 1ms.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval: min_interval.max(MIN_INTERVAL_FLOOR),
            last_start: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `op` once this throttle admits it. Whatever `op` resolves to,
    /// including errors, is returned unchanged.
    pub async fn run<F, Fut, T>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.admit().await;
        op().await
    }

    /// Wrap `f` into a function with the same argument and result whose
    /// invocations all go through this throttle.
    pub fn wrap<A, T, F, Fut>(
        self: &Arc<Self>,
        f: F,
    ) -> impl Fn(A) -> BoxFuture<'static, T> + Clone + Send + Sync + 'static
    where
        F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        A: Send + 'static,
        T: Send + 'static,
    {
        let throttle = Arc::clone(self);
        move |args: A| -> BoxFuture<'static, T> {
            let throttle = Arc::clone(&throttle);
            let f = f.clone();
            async move { throttle.run(move || f(args)).await }.boxed()
        }
    }

    /// Wait for our turn and stamp the start time. Returns the start instant.
    async fn admit(&self) -> Instant {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "throttle delaying call"
                );
                sleep_until(ready_at).await;
            }
        }
        let started = Instant::now();
        *last = Some(started);
        started
    }
}
