//! # Lifecycle events emitted by task executors.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: execution flow of a single task
//!   (started, stopped, continued, finished)
//! - **Failure events**: an action failed and was routed to a handler
//! - **Tree events**: parent/child attachment changes
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task
//! name, the link index within the chain, error messages, and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. This guarantees that events can be ordered correctly even
//! when delivered out-of-order through broadcast channels.
//!
//! ## Example
//! ```rust
//! # #[cfg(feature = "events")]
//! # {
//! use taskchain::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::ActionFailed)
//!     .with_task("demo-task")
//!     .with_link(2)
//!     .with_error("boom");
//!
//! assert_eq!(ev.kind, EventKind::ActionFailed);
//! assert_eq!(ev.task.as_deref(), Some("demo-task"));
//! assert_eq!(ev.link, Some(2));
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// The executor entered the chain (the start hook has fired).
    TaskStarted,
    /// The executor unwound after a stop request.
    TaskStopped,
    /// The executor resumed a stopped task (the cont hook has fired).
    TaskContinued,
    /// The chain was exhausted; the task reached its terminal state.
    TaskFinished,

    // === Failure events ===
    /// An action failed; carries the task, link index and error message.
    ActionFailed,

    // === Tree events ===
    /// A child task was attached to this task.
    ChildAttached,
    /// A child task detached (finished or was released).
    ChildDetached,
}

/// Lifecycle event with optional metadata.
///
/// Carries information about state transitions, failures and tree changes.
///
/// ## Fields
///
/// - `seq`: Unique sequence number for ordering (monotonically increasing)
/// - `at`: Wall-clock timestamp (may go backwards due to NTP, use for logging only)
/// - `kind`: Event classification
/// - `task`, `link`, `error`, `delay`: Optional metadata
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<String>,
    /// Link index within the chain, if applicable.
    pub link: Option<usize>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Pending delay (residual wait, start delay), if relevant.
    pub delay: Option<Duration>,
    /// Name of the child task, for tree events.
    pub child: Option<String>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            link: None,
            error: None,
            delay: None,
            child: None,
        }
    }

    /// Attaches a task name.
    pub fn with_task(mut self, name: impl Into<String>) -> Self {
        self.task = Some(name.into());
        self
    }

    /// Attaches a link index.
    pub fn with_link(mut self, link: usize) -> Self {
        self.link = Some(link);
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a delay.
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Attaches a child task name (tree events).
    pub fn with_child(mut self, name: impl Into<String>) -> Self {
        self.child = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::now(EventKind::TaskStarted);
        let b = Event::now(EventKind::TaskFinished);
        assert!(b.seq > a.seq);
    }
}
