//! # Error types used by the taskchain runtime and user actions.
//!
//! This module defines two main error enums:
//!
//! - [`TaskError`] errors raised by the task API itself (contract misuse,
//!   plus the record of a run that ended in an unhandled action failure).
//! - [`ActionError`] errors raised by user-supplied actions.
//!
//! Both types provide helper methods `as_label` for logs/metrics.
//! An [`ActionError`] is never converted into a misuse error: action failures
//! travel through the exception-handler climb (see [`crate::core`]), misuse
//! errors surface synchronously at the call site.

use thiserror::Error;

use crate::tasks::State;

/// # Errors produced by the task API.
///
/// These represent contract violations by the caller, not failures of the
/// work itself. They are reported synchronously and never alter task state.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The operation is not allowed in the task's current state.
    #[error("cannot {op} from state {state:?}")]
    InvalidState {
        /// The operation that was attempted (`"start"`, `"cont"`, ...).
        op: &'static str,
        /// The state the task was in when the operation was attempted.
        state: State,
    },

    /// An argument violated the API contract.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the violation.
        reason: String,
    },

    /// The last run of the task ended with an unhandled action failure.
    ///
    /// Returned by [`Task::join`](crate::Task::join) (and blocking further
    /// [`Task::cont`](crate::Task::cont) calls) after the default exception
    /// handler stopped the task. Identifies the offending task and the link
    /// index within its chain.
    #[error("task '{task}' failed at link {link}: {reason}")]
    ActionFailed {
        /// Name of the task whose action failed.
        task: String,
        /// Zero-based index of the failing link within the chain.
        link: usize,
        /// Rendered failure message.
        reason: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::InvalidState { .. } => "task_invalid_state",
            TaskError::InvalidArgument { .. } => "task_invalid_argument",
            TaskError::ActionFailed { .. } => "task_action_failed",
        }
    }

    pub(crate) fn invalid_state(op: &'static str, state: State) -> Self {
        TaskError::InvalidState { op, state }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        TaskError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by user actions.
///
/// These represent failures of the work a link performs. They are routed
/// through the exception-handler climb rather than returned to API callers;
/// an unhandled failure is recorded on the failing task and surfaces from
/// `join()` as [`TaskError::ActionFailed`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ActionError {
    /// The action reported a failure.
    #[error("execution failed: {reason}")]
    Fail {
        /// Why the action failed.
        reason: String,
    },

    /// Wrapper for an arbitrary error raised inside an action.
    #[error("{source}")]
    Other {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ActionError {
    /// Creates a [`ActionError::Fail`] from a message.
    pub fn fail(reason: impl Into<String>) -> Self {
        ActionError::Fail {
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary error.
    pub fn other(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ActionError::Other {
            source: source.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::Fail { .. } => "action_failed",
            ActionError::Other { .. } => "action_other",
        }
    }
}

impl From<TaskError> for ActionError {
    /// Lets actions propagate child-control misuse (`ctx.start_child(..)?`)
    /// into the regular failure path.
    fn from(e: TaskError) -> Self {
        ActionError::fail(e.to_string())
    }
}
