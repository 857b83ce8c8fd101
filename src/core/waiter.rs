//! # Interruptible wait primitive.
//!
//! [`Waiter`] replaces plain sleeps everywhere a task waits: a blocking delay
//! that can be signalled to return early, reporting how much time remained.
//!
//! ## Contract
//! - [`Waiter::wait`] sleeps up to the requested duration on the **steady**
//!   clock ([`tokio::time::Instant`]) and returns the unused remainder:
//!   [`Duration::ZERO`] if the full time elapsed, positive if interrupted.
//! - [`Waiter::interrupt`] is safe from any context and never takes the task
//!   mutex, so a stop request issued while the executor holds it cannot
//!   deadlock.
//! - An interrupt delivered *before* the next wait is entered makes that wait
//!   return immediately with the full remainder; repeated interrupts coalesce
//!   into one until a wait consumes them.
//!
//! Callers are expected to re-check their state after every return and
//! re-wait the remainder if the interrupt turns out to be stale; the executor
//! does exactly that.

use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};

/// A reusable, interruptible delay.
///
/// One waiter lives per task and is re-armed implicitly: consuming the
/// stored interrupt permit readies it for the next stop/continue cycle.
#[derive(Default)]
pub struct Waiter {
    notify: Notify,
}

impl Waiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps up to `dur`, returning the unused remainder.
    ///
    /// Returns [`Duration::ZERO`] when the full duration elapsed, or the
    /// (positive) remaining time when [`interrupt`](Waiter::interrupt) cut
    /// the wait short. Remainders are exact to the steady clock's
    /// granularity, so repeated stop/continue cycles do not accumulate
    /// drift.
    pub async fn wait(&self, dur: Duration) -> Duration {
        if dur.is_zero() {
            return Duration::ZERO;
        }
        let deadline = Instant::now() + dur;
        tokio::select! {
            _ = self.notify.notified() => deadline.saturating_duration_since(Instant::now()),
            _ = time::sleep_until(deadline) => Duration::ZERO,
        }
    }

    /// Signals the current (or next) wait to return early.
    ///
    /// Idempotent until a wait consumes the signal. Never blocks, never
    /// takes any lock shared with the executor.
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn full_wait_returns_zero() {
        let w = Waiter::new();
        let rem = w.wait(Duration::from_secs(3)).await;
        assert_eq!(rem, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_reports_remainder() {
        let w = Arc::new(Waiter::new());
        let w2 = w.clone();
        let handle = tokio::spawn(async move { w2.wait(Duration::from_secs(10)).await });
        time::sleep(Duration::from_secs(4)).await;
        w.interrupt();
        let rem = handle.await.expect("join");
        assert_eq!(rem, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_before_wait_short_circuits() {
        let w = Waiter::new();
        w.interrupt();
        let rem = w.wait(Duration::from_secs(5)).await;
        assert_eq!(rem, Duration::from_secs(5));
        // The permit is consumed: the next wait runs to completion.
        let rem = w.wait(Duration::from_secs(5)).await;
        assert_eq!(rem, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupts_coalesce() {
        let w = Waiter::new();
        w.interrupt();
        w.interrupt();
        w.interrupt();
        assert_eq!(w.wait(Duration::from_secs(1)).await, Duration::from_secs(1));
        assert_eq!(w.wait(Duration::from_secs(1)).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_wait_is_instant() {
        let w = Waiter::new();
        assert_eq!(w.wait(Duration::ZERO).await, Duration::ZERO);
    }
}
