//! # Links: the steps of a task's chain.
//!
//! A [`Link`] is one executable step: an action (or a child-task directive),
//! an optional post-action `duration`, an optional per-link exception
//! handler, and the residual bookkeeping the executor needs to resume the
//! step after a stop (`cnt`, `gap_rest`, `duration_rest`).
//!
//! [`LinkKind`] distinguishes how the action's return value is adapted and
//! which steps the executor performs natively (child start/join directives
//! are first-class so they stay resumable across stop/continue cycles).

use std::sync::Arc;
use std::time::Duration;

use crate::error::ActionError;
use crate::tasks::{ActionRef, RepeatPolicy, Task};

/// Lifecycle hook: a user closure fired on a transition.
///
/// Arguments are captured by the closure; hooks always run on the task's
/// executor context.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Exception handler attached to a link or inherited along the climb.
///
/// Returning `Ok(())` swallows the failure (the chain proceeds); returning
/// `Err(e)` re-raises `e`, which unwinds the failing task's executor.
pub type ExcHandler = Arc<dyn Fn(&Fault) -> Result<(), ActionError> + Send + Sync>;

/// Context handed to exception handlers: which task, which link, what error.
#[derive(Clone)]
pub struct Fault {
    /// Name of the task whose action failed.
    pub task: String,
    /// Zero-based index of the failing link within that task's chain.
    pub link: usize,
    /// The failure itself.
    pub error: Arc<ActionError>,
}

impl std::fmt::Debug for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fault")
            .field("task", &self.task)
            .field("link", &self.link)
            .field("error", &self.error)
            .finish()
    }
}

/// How a link executes and how its action's return value is adapted.
pub(crate) enum LinkKind {
    /// Run the action exactly once.
    Once,
    /// Re-invoke the action according to the returned [`Control`](crate::Control)
    /// and the repeat policy.
    Repeated(RepeatPolicy),
    /// Re-invoke the action on a fixed interval (policy carries it) until it
    /// reports done or the cap is reached.
    Periodic(RepeatPolicy),
    /// Start a child task, optionally with a start delay, optionally joining
    /// it before advancing.
    StartChild {
        child: Task,
        delay: Option<Duration>,
        join: bool,
    },
    /// Join a child task started earlier in the chain.
    JoinChild { child: Task },
}

/// One step of a chain.
pub(crate) struct Link {
    pub action: ActionRef,
    pub kind: LinkKind,
    /// Post-action wait measured against the schedule anchor.
    pub duration: Option<Duration>,
    /// Per-link exception handler (climb step 1; the head link's handler is
    /// also climb step 2 for the whole chain).
    pub exc_handler: Option<ExcHandler>,

    // Residual bookkeeping, owned by the executor.
    /// Invocations of the action so far in the current loop.
    pub cnt: usize,
    /// Remainder of an interrupted repeat gap.
    pub gap_rest: Option<Duration>,
    /// The action phase is complete; only the duration wait remains.
    pub duration_rest: bool,
}

impl Link {
    pub fn new(action: ActionRef, kind: LinkKind) -> Self {
        Self {
            action,
            kind,
            duration: None,
            exc_handler: None,
            cnt: 0,
            gap_rest: None,
            duration_rest: false,
        }
    }

    /// Clears the residual bookkeeping (restart from STOPPED).
    pub fn reset(&mut self) {
        self.cnt = 0;
        self.gap_rest = None;
        self.duration_rest = false;
    }
}
