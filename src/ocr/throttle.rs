use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Gate awaited before each rate-limited call.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Wait until the next call is allowed, then claim the slot.
    async fn acquire(&self);
}

/// Enforces a minimum spacing between consecutive calls.
pub struct FixedIntervalThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedIntervalThrottle {
    /// Allow at most one call per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Throttle for FixedIntervalThrottle {
    async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                let wait_ms = (ready_at - Instant::now()).as_millis() as u64;
                tracing::trace!(wait_ms, "Throttling call");
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Throttle that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoThrottle;

#[async_trait]
impl Throttle for NoThrottle {
    async fn acquire(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate_then_spaced() {
        let throttle = FixedIntervalThrottle::new(Duration::from_secs(1));
        let start = Instant::now();

        throttle.acquire().await;
        assert_eq!(Instant::now() - start, Duration::ZERO);

        throttle.acquire().await;
        assert!(Instant::now() - start >= Duration::from_secs(1));

        throttle.acquire().await;
        assert!(Instant::now() - start >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_is_not_waited_again() {
        let throttle = FixedIntervalThrottle::new(Duration::from_millis(500));
        throttle.acquire().await;
        tokio::time::advance(Duration::from_millis(800)).await;

        let before = Instant::now();
        throttle.acquire().await;
        assert_eq!(Instant::now() - before, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn no_throttle_never_waits() {
        let start = Instant::now();
        for _ in 0..5 {
            NoThrottle.acquire().await;
        }
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }
}
