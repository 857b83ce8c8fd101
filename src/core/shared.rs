//! # Shared task core.
//!
//! [`Core`] is the heart of a task: the chain, the `(state, activity)` pair,
//! the residual bookkeeping the executor needs to resume after a stop, the
//! parent/child registry and the interruptible [`Waiter`]. Everything mutable
//! lives in one [`Inner`] behind one mutex, so any externally observed
//! `(state, activity)` pair is consistent (see `tasks::state::legal_pair`).
//!
//! State transitions are mirrored into a `watch` channel so `join()` and a
//! continuation waiting out a previous stop cycle can sleep on transitions
//! instead of polling. The watch payload also carries the *attaching* flag:
//! the short window in which a continuation executor was spawned but has not
//! yet become visible as `TO_CONTINUE`/`STARTED` must not look idle to
//! `join()`.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::core::Waiter;
use crate::error::ActionError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::state::legal_pair;
use crate::tasks::{Activity, Hook, Link, State, Task};

/// Process-wide counter backing default task names (`task-N`).
static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Returns the next default task name.
pub(crate) fn next_task_name() -> String {
    format!("task-{}", TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
}

/// Consistent `(state, attaching)` snapshot published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub state: State,
    pub attaching: bool,
}

/// Shared, lock-protected task body.
pub(crate) struct Core {
    /// Human-readable identifier (logs, events, faults).
    pub name: String,
    /// Lifecycle event bus (observability only).
    pub bus: Bus,
    /// The interruptible wait primitive owned by this task's executor.
    ///
    /// Deliberately outside the mutex: `interrupt()` must work while the
    /// executor holds the lock.
    pub waiter: Waiter,
    /// Everything mutable, under the one task mutex.
    pub inner: Mutex<Inner>,
    /// Transition mirror for `join()` and continuation hand-off.
    watch_tx: watch::Sender<Snapshot>,
}

/// Mutable task state. All fields are guarded by [`Core::inner`].
pub(crate) struct Inner {
    pub state: State,
    pub activity: Activity,

    /// The chain. Index 0 is the head link.
    pub links: Vec<Link>,
    /// The link currently (or next) being executed.
    pub cursor: usize,

    // --- run bookkeeping ---
    /// The chain was entered this run (`on_start` fired).
    pub begun: bool,
    /// A hook cycle is open: `on_start`/`on_cont` fired, `on_stop` has not.
    pub active: bool,
    /// A start/continue executor was spawned but has not settled yet.
    pub attaching: bool,

    // --- residuals ---
    /// Remaining start/continue delay.
    pub resume_delay: Option<Duration>,
    /// When the request carrying `resume_delay` was accepted.
    pub delay_called_at: Option<Instant>,
    /// Schedule anchor of the current link (durations are measured against
    /// it; shifted by the stop-to-cont gap on continue).
    pub anchor: Option<Instant>,
    /// When the effective stop request was accepted.
    pub stopped_at: Option<Instant>,

    // --- tree ---
    /// Running children (non-owning in spirit: children detach themselves).
    pub children: Vec<Task>,
    /// Weak back-reference for exception climbing only.
    pub parent: Option<WeakTask>,
    /// Child to re-join on continue (a join cut short by a stop).
    pub rejoin: Option<Task>,

    // --- lifecycle ---
    /// The chain was appended into another task; head operations are dead.
    pub consumed: bool,
    /// Unhandled action failure of the last run: `(link index, error)`.
    pub error: Option<(usize, Arc<ActionError>)>,

    // --- head hooks ---
    pub on_start: Option<Hook>,
    pub on_stop: Option<Hook>,
    pub on_cont: Option<Hook>,
    pub on_final: Option<Hook>,
}

impl Core {
    pub fn new(name: String, links: Vec<Link>) -> Arc<Self> {
        let (watch_tx, _) = watch::channel(Snapshot {
            state: State::Created,
            attaching: false,
        });
        Arc::new(Self {
            name,
            bus: Bus::new(),
            waiter: Waiter::new(),
            watch_tx,
            inner: Mutex::new(Inner {
                state: State::Created,
                activity: Activity::None,
                links,
                cursor: 0,
                begun: false,
                active: false,
                attaching: false,
                resume_delay: None,
                delay_called_at: None,
                anchor: None,
                stopped_at: None,
                children: Vec::new(),
                parent: None,
                rejoin: None,
                consumed: false,
                error: None,
                on_start: None,
                on_stop: None,
                on_cont: None,
                on_final: None,
            }),
        })
    }

    /// Locks the inner state.
    ///
    /// Poisoning is ignored: the state machine keeps its own invariants and a
    /// panicked executor must not brick `stop()`/`join()` for everyone else.
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Transitions the state and publishes the new snapshot.
    pub fn set_state(&self, inner: &mut Inner, state: State) {
        inner.state = state;
        debug_assert!(
            legal_pair(inner.state, inner.activity),
            "illegal pair: {:?}/{:?}",
            inner.state,
            inner.activity
        );
        self.publish_watch(inner);
    }

    /// Updates the fine-grained activity.
    pub fn set_activity(&self, inner: &mut Inner, activity: Activity) {
        inner.activity = activity;
        debug_assert!(
            legal_pair(inner.state, inner.activity),
            "illegal pair: {:?}/{:?}",
            inner.state,
            inner.activity
        );
    }

    /// Flips the attaching flag and publishes the new snapshot.
    pub fn set_attaching(&self, inner: &mut Inner, attaching: bool) {
        inner.attaching = attaching;
        self.publish_watch(inner);
    }

    /// Publishes the current `(state, attaching)` snapshot.
    pub fn publish_watch(&self, inner: &Inner) {
        self.watch_tx.send_replace(Snapshot {
            state: inner.state,
            attaching: inner.attaching,
        });
    }

    /// Subscribes to state transitions.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.watch_tx.subscribe()
    }

    /// Publishes a lifecycle event tagged with this task's name.
    pub fn publish_event(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            core: self,
            event: Event::now(kind).with_task(self.name.clone()),
        }
    }
}

/// Small helper so call sites read like the bus API:
/// `core.publish_event(kind).with_link(i).send()`.
pub(crate) struct EventBuilder<'a> {
    core: &'a Core,
    event: Event,
}

impl EventBuilder<'_> {
    pub fn with_link(mut self, link: usize) -> Self {
        self.event = self.event.with_link(link);
        self
    }

    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.event = self.event.with_error(msg);
        self
    }

    pub fn with_child(mut self, name: impl Into<String>) -> Self {
        self.event = self.event.with_child(name);
        self
    }

    pub fn send(self) {
        self.core.bus.publish(self.event);
    }
}

impl Inner {
    /// True when the task may be reconfigured or appended to.
    pub fn writable(&self) -> bool {
        !self.attaching
            && matches!(
                self.state,
                State::Created | State::Stopped | State::Finished
            )
    }

    /// True when every link has been advanced past.
    pub fn chain_done(&self) -> bool {
        self.begun && self.cursor >= self.links.len()
    }

    /// Clears the residuals of a previous run (restart from STOPPED/FINISHED).
    pub fn reset_run(&mut self) {
        for link in &mut self.links {
            link.reset();
        }
        self.cursor = 0;
        self.begun = false;
        self.active = false;
        self.resume_delay = None;
        self.delay_called_at = None;
        self.anchor = None;
        self.stopped_at = None;
        self.rejoin = None;
        self.error = None;
    }
}

/// Weak, non-owning handle to a task.
///
/// Held by children toward their parent (exception climbing only); never
/// keeps a task alive.
#[derive(Clone)]
pub(crate) struct WeakTask {
    core: std::sync::Weak<Core>,
}

impl WeakTask {
    pub fn new(task: &Task) -> Self {
        Self {
            core: Arc::downgrade(&task.core),
        }
    }

    pub fn upgrade(&self) -> Option<Task> {
        self.core.upgrade().map(|core| Task { core })
    }
}
