//! # Builder for tasks.
//!
//! [`TaskBuilder`] assembles a one-link task: the link's behaviour (once /
//! repeated / periodic / sleep / child directive), its timing, its exception
//! handler and the head hooks. Chains are made by splicing built tasks
//! together with [`Task::append`](crate::Task::append) or
//! [`concat`](crate::concat).
//!
//! Validation happens in [`TaskBuilder::build`]; contract violations (a cap
//! of zero, repeat options on a single-shot task, a duration on a sleep
//! task) surface as [`TaskError::InvalidArgument`].
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use taskchain::{ActionFn, Control, Task};
//!
//! # fn demo() -> Result<(), taskchain::TaskError> {
//! let poll = Task::periodic(
//!     Duration::from_secs(2),
//!     ActionFn::arc(|_ctx| async { Ok(Control::Again) }),
//! )
//! .with_name("poll")
//! .with_num(3)
//! .on_stop(|| println!("stopped"))
//! .build()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::core::shared::next_task_name;
use crate::core::Core;
use crate::error::{ActionError, TaskError};
use crate::tasks::action::Noop;
use crate::tasks::link::{ExcHandler, Hook, Link, LinkKind};
use crate::tasks::{ActionRef, Fault, RepeatPolicy, Task};

enum BuilderKind {
    Once,
    Repeated,
    Periodic { interval: Duration },
    Sleep { seconds: Duration },
    StartChild {
        child: Task,
        delay: Option<Duration>,
        join: bool,
    },
    JoinChild { child: Task },
}

impl BuilderKind {
    fn is_repeating(&self) -> bool {
        matches!(self, BuilderKind::Repeated | BuilderKind::Periodic { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            BuilderKind::Once => "once",
            BuilderKind::Repeated => "repeated",
            BuilderKind::Periodic { .. } => "periodic",
            BuilderKind::Sleep { .. } => "sleep",
            BuilderKind::StartChild { .. } => "child-start",
            BuilderKind::JoinChild { .. } => "child-join",
        }
    }
}

/// Fluent builder returned by the [`Task`] constructors.
pub struct TaskBuilder {
    kind: BuilderKind,
    action: Option<ActionRef>,
    name: Option<String>,
    duration: Option<Duration>,
    num: Option<usize>,
    netto_time: Option<bool>,
    exc_handler: Option<ExcHandler>,
    on_start: Option<Hook>,
    on_stop: Option<Hook>,
    on_cont: Option<Hook>,
    on_final: Option<Hook>,
}

impl TaskBuilder {
    fn new(kind: BuilderKind, action: Option<ActionRef>) -> Self {
        Self {
            kind,
            action,
            name: None,
            duration: None,
            num: None,
            netto_time: None,
            exc_handler: None,
            on_start: None,
            on_stop: None,
            on_cont: None,
            on_final: None,
        }
    }

    pub(crate) fn once(action: ActionRef) -> Self {
        Self::new(BuilderKind::Once, Some(action))
    }

    pub(crate) fn repeated(action: ActionRef) -> Self {
        Self::new(BuilderKind::Repeated, Some(action))
    }

    pub(crate) fn periodic(interval: Duration, action: ActionRef) -> Self {
        Self::new(BuilderKind::Periodic { interval }, Some(action))
    }

    pub(crate) fn sleep(seconds: Duration) -> Self {
        Self::new(BuilderKind::Sleep { seconds }, None)
    }

    pub(crate) fn starts(child: &Task, delay: Option<Duration>, join: bool) -> Self {
        Self::new(
            BuilderKind::StartChild {
                child: child.clone(),
                delay,
                join,
            },
            None,
        )
    }

    pub(crate) fn joins(child: &Task) -> Self {
        Self::new(
            BuilderKind::JoinChild {
                child: child.clone(),
            },
            None,
        )
    }

    /// Overrides the generated `task-N` name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Post-action wait of the link. If the action (or loop) returns
    /// earlier, the task waits out the remainder; the wait is interruptible
    /// and its residual survives stop/continue.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Caps the number of action invocations (repeated/periodic only).
    pub fn with_num(mut self, num: usize) -> Self {
        self.num = Some(num);
        self
    }

    /// Measures repeat gaps from the end of an invocation instead of its
    /// start (repeated/periodic only).
    pub fn with_netto_time(mut self, netto: bool) -> Self {
        self.netto_time = Some(netto);
        self
    }

    /// Hook fired when the chain is entered.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Hook fired when a stop cycle closes (before STOPPED becomes visible).
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// Hook fired when a continue cycle opens (before any further action).
    pub fn on_cont<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_cont = Some(Arc::new(hook));
        self
    }

    /// Hook fired when the task finishes naturally.
    pub fn on_final<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_final = Some(Arc::new(hook));
        self
    }

    /// Exception handler of this link (also the whole chain's handler when
    /// this task ends up as the head of a chain).
    pub fn exc_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Fault) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.exc_handler = Some(Arc::new(handler));
        self
    }

    /// Validates the configuration and assembles the task.
    pub fn build(self) -> Result<Task, TaskError> {
        if !self.kind.is_repeating() {
            if self.num.is_some() {
                return Err(TaskError::invalid_argument(format!(
                    "num is not valid for {} tasks",
                    self.kind.label()
                )));
            }
            if self.netto_time.is_some() {
                return Err(TaskError::invalid_argument(format!(
                    "netto_time is not valid for {} tasks",
                    self.kind.label()
                )));
            }
        }
        if matches!(self.num, Some(0)) {
            return Err(TaskError::invalid_argument("num must be positive"));
        }
        if matches!(self.kind, BuilderKind::Sleep { .. }) && self.duration.is_some() {
            return Err(TaskError::invalid_argument(
                "sleep tasks take their duration from the constructor",
            ));
        }

        let policy = RepeatPolicy {
            num: self.num,
            interval: match &self.kind {
                BuilderKind::Periodic { interval } => Some(*interval),
                _ => None,
            },
            netto_time: self.netto_time.unwrap_or(false),
        };

        let (kind, action, duration) = match self.kind {
            BuilderKind::Once => (LinkKind::Once, self.action, self.duration),
            BuilderKind::Repeated => (LinkKind::Repeated(policy), self.action, self.duration),
            BuilderKind::Periodic { .. } => {
                (LinkKind::Periodic(policy), self.action, self.duration)
            }
            BuilderKind::Sleep { seconds } => (LinkKind::Once, None, Some(seconds)),
            BuilderKind::StartChild { child, delay, join } => {
                (LinkKind::StartChild { child, delay, join }, None, self.duration)
            }
            BuilderKind::JoinChild { child } => {
                (LinkKind::JoinChild { child }, None, self.duration)
            }
        };

        let mut link = Link::new(action.unwrap_or_else(|| Arc::new(Noop)), kind);
        link.duration = duration;
        link.exc_handler = self.exc_handler;

        let core = Core::new(
            self.name.unwrap_or_else(next_task_name),
            vec![link],
        );
        {
            let mut inner = core.lock();
            inner.on_start = self.on_start;
            inner.on_stop = self.on_stop;
            inner.on_cont = self.on_cont;
            inner.on_final = self.on_final;
        }
        Ok(Task { core })
    }
}
