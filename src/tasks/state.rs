//! # Task lifecycle vocabulary.
//!
//! Two orthogonal enums describe what a task is doing:
//!
//! - [`State`] coarse position in the lifecycle machine
//!   (`CREATED → STARTED → TO_STOP → STOPPED → TO_CONTINUE → ... → FINISHED`).
//! - [`Activity`] fine-grained status of the executor while the task runs
//!   (inside a user action, inside an interruptible wait, joining a child).
//!
//! Readers obtain both under a single lock, so any externally observed
//! `(state, activity)` pair is drawn from the legal product checked by
//! [`legal_pair`].

/// Coarse lifecycle state of a task.
///
/// Transitions are driven by `start` / `stop` / `cont` requests and by the
/// executor observing them; see the crate docs for the full diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Built but never started.
    Created,
    /// An executor is attached and advancing the chain.
    Started,
    /// A stop was requested; the executor has not unwound yet.
    ToStop,
    /// The executor unwound; the task can be continued or restarted.
    Stopped,
    /// A continue was requested; the new executor has not taken over yet.
    ToContinue,
    /// The chain was exhausted; the task can be restarted.
    Finished,
}

impl State {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Started => "started",
            State::ToStop => "to_stop",
            State::Stopped => "stopped",
            State::ToContinue => "to_continue",
            State::Finished => "finished",
        }
    }

    /// True while an executor is (or is about to be) attached.
    pub fn is_active(&self) -> bool {
        matches!(self, State::Started | State::ToStop | State::ToContinue)
    }
}

/// Fine-grained executor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Not inside an action, wait or join.
    None,
    /// Inside a user action.
    Busy,
    /// Inside an interruptible wait.
    Sleep,
    /// Awaiting a child task.
    Join,
}

impl Activity {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Activity::None => "none",
            Activity::Busy => "busy",
            Activity::Sleep => "sleep",
            Activity::Join => "join",
        }
    }
}

/// Checks whether a `(state, activity)` pair is part of the legal product.
///
/// Used by debug assertions on every transition; a violation is a library
/// bug, never a user error.
pub(crate) fn legal_pair(state: State, activity: Activity) -> bool {
    match activity {
        Activity::None => true,
        // The executor only performs waits/actions/joins while running or
        // while a stop request is pending observation. `ToContinue` is the
        // attach hand-off only: the continuation flips to `Started` before
        // any wait, action or join runs.
        Activity::Sleep | Activity::Busy | Activity::Join => {
            matches!(state, State::Started | State::ToStop)
        }
    }
}
