//! Request pacing for the remote API.
//!
//! `Pacer` is a GCRA leaky bucket: each request is scheduled one emission
//! interval after the previous one, and up to `burst` requests may run ahead
//! of that schedule. Time comes from a `Clock` so tests can run without
//! real sleeps.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Source of monotonic time.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for tests. Sleeping advances time instantly and is recorded.
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

#[async_trait]
impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// Pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacerConfig {
    /// Sustained request rate; zero or less disables pacing
    pub requests_per_second: f64,
    /// Requests allowed back to back before pacing kicks in (min 1)
    pub burst: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            burst: 3,
        }
    }
}

/// Leaky-bucket rate limiter.
pub struct Pacer<C: Clock = TokioClock> {
    clock: C,
    interval: Duration,
    tolerance: Duration,
    /// Theoretical arrival time of the next request
    tat: Duration,
}

impl<C: Clock> Pacer<C> {
    pub fn new(clock: C, config: PacerConfig) -> Self {
        let interval = if config.requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / config.requests_per_second)
        } else {
            Duration::ZERO
        };
        let tolerance = interval * config.burst.max(1).saturating_sub(1);
        Self {
            clock,
            interval,
            tolerance,
            tat: Duration::ZERO,
        }
    }

    /// A pacer that never waits.
    pub fn unlimited(clock: C) -> Self {
        Self::new(
            clock,
            PacerConfig {
                requests_per_second: 0.0,
                burst: 1,
            },
        )
    }

    /// Wait until the next request may be sent.
    pub async fn acquire(&mut self) {
        let now = self.clock.now();
        let tat = self.tat.max(now);
        let allow_at = tat.saturating_sub(self.tolerance);
        if allow_at > now {
            self.clock.sleep(allow_at - now).await;
        }
        self.tat = tat + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pacer(rps: f64, burst: u32) -> (Arc<ManualClock>, Pacer<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new());
        let pacer = Pacer::new(
            clock.clone(),
            PacerConfig {
                requests_per_second: rps,
                burst,
            },
        );
        (clock, pacer)
    }

    #[tokio::test]
    async fn test_burst_passes_without_waiting() {
        let (clock, mut pacer) = pacer(2.0, 3);
        for _ in 0..3 {
            pacer.acquire().await;
        }
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_sustained_rate_after_burst() {
        let (clock, mut pacer) = pacer(2.0, 1);
        for _ in 0..4 {
            pacer.acquire().await;
        }
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500); 3]);
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_idle_time_refills_the_bucket() {
        let (clock, mut pacer) = pacer(1.0, 2);
        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);

        clock.advance(Duration::from_secs(10));
        pacer.acquire().await;
        pacer.acquire().await;
        assert_eq!(clock.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_unlimited_never_sleeps() {
        let clock = Arc::new(ManualClock::new());
        let mut pacer = Pacer::unlimited(clock.clone());
        for _ in 0..50 {
            pacer.acquire().await;
        }
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }
}
