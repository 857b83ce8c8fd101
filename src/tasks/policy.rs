//! # Repeat policy for looping links.
//!
//! [`RepeatPolicy`] controls how a repeating link re-invokes its action.
//! It is parameterized by:
//! - [`RepeatPolicy::num`] an optional cap on the number of invocations;
//! - [`RepeatPolicy::interval`] a fixed gap between invocations (periodic links);
//! - [`RepeatPolicy::netto_time`] whether gaps are measured from the end of an
//!   invocation instead of its start.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskchain::RepeatPolicy;
//!
//! let policy = RepeatPolicy {
//!     num: Some(3),
//!     interval: Some(Duration::from_secs(2)),
//!     netto_time: false,
//! };
//!
//! // Interval measured from the start of an invocation that took 500ms:
//! // 1.5s of the gap remain.
//! assert_eq!(
//!     policy.next_gap(Duration::from_secs(2), Duration::from_millis(500)),
//!     Duration::from_millis(1500),
//! );
//! ```

use std::time::Duration;

/// Repeat policy of a looping link.
///
/// Carried by repeated and periodic links; a plain once link has none.
#[derive(Clone, Copy, Debug, Default)]
pub struct RepeatPolicy {
    /// Maximum number of action invocations (`None` = unbounded).
    pub num: Option<usize>,
    /// Fixed gap between invocations (periodic links; overrides any gap the
    /// action returns).
    pub interval: Option<Duration>,
    /// Measure gaps from the moment the action returned instead of the
    /// moment it started (the action's own runtime then counts extra).
    pub netto_time: bool,
}

impl RepeatPolicy {
    /// True once `count` invocations exhaust the cap.
    pub fn exhausted(&self, count: usize) -> bool {
        matches!(self.num, Some(n) if count >= n)
    }

    /// Computes the actual wait before the next invocation from the gap the
    /// protocol produced and the time the invocation itself consumed.
    ///
    /// Brutto (default): the invocation time counts toward the gap, so a
    /// periodic link fires on a fixed grid. Netto: the gap is taken as-is.
    pub fn next_gap(&self, gap: Duration, elapsed: Duration) -> Duration {
        if self.netto_time {
            gap
        } else {
            gap.saturating_sub(elapsed)
        }
    }
}
