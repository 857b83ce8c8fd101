//! # Task context: the tree-routing handle actions receive.
//!
//! Every action invocation gets a [`TaskContext`] addressing the task whose
//! executor is running it. Through the context an action can launch and wait
//! for **children**; children started this way are registered with the
//! running task, so:
//!
//! - stopping the parent stops them first,
//! - continuing the parent continues the ones that were stopped,
//! - an unhandled failure in a child climbs into the parent's handlers.
//!
//! The free helpers in this module ([`attach_child`], [`remove_child`],
//! [`join_child_inner`]) are shared with the executor's native child links
//! (`starts` / `runs` / `joins`), so both spellings behave identically.

use std::sync::Arc;
use std::time::Duration;

use crate::core::shared::WeakTask;
use crate::core::Core;
use crate::error::TaskError;
use crate::events::EventKind;
use crate::tasks::{Activity, State, Task};

/// Handle to the running task, passed to every action invocation.
///
/// Cloneable; clones address the same task.
#[derive(Clone)]
pub struct TaskContext {
    task: Task,
}

impl TaskContext {
    pub(crate) fn new(task: Task) -> Self {
        Self { task }
    }

    /// The task whose executor is running this action.
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Name of the running task.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Starts `child` as a child of the running task.
    ///
    /// The child runs on its own execution context; the link between the two
    /// tasks lasts until the child finishes.
    pub fn start_child(&self, child: &Task) -> Result<(), TaskError> {
        self.launch_child(child, None)
    }

    /// Starts `child` as a child of the running task, honouring `delay`
    /// before the child's first action.
    pub fn start_child_after(&self, child: &Task, delay: Duration) -> Result<(), TaskError> {
        self.launch_child(child, Some(delay))
    }

    /// Runs `child` threadless: inline on the running task's execution
    /// context, returning when the child reaches STOPPED or FINISHED.
    ///
    /// The child is registered like any other child, so stop/continue still
    /// route through the parent.
    pub async fn run_child(&self, child: &Task) -> Result<(), TaskError> {
        attach_child(&self.task, child);
        child.accept_start(None)?;
        if self.task.state() == State::ToStop {
            let _ = child.stop();
        }
        crate::core::executor::run(child.core.clone(), crate::core::executor::Launch::Start)
            .await;
        child.error_result()
    }

    /// Waits for `child` to come to rest, reporting its state.
    ///
    /// The running task shows `Activity::Join` for the duration. If the wait
    /// is cut short because the parent itself is being stopped (the child
    /// merely reached STOPPED), the executor re-joins the child on continue
    /// before the chain advances.
    pub async fn join_child(&self, child: &Task) -> State {
        join_child_inner(&self.task.core, child, Activity::Busy).await;
        child.state()
    }

    fn launch_child(&self, child: &Task, delay: Option<Duration>) -> Result<(), TaskError> {
        attach_child(&self.task, child);
        let res = match delay {
            Some(d) => child.start_after(d),
            None => child.start(),
        };
        // A stop may have snapshotted the children before this one was
        // registered; route it through now.
        if self.task.state() == State::ToStop {
            let _ = child.stop();
        }
        res
    }
}

/// Registers `child` with `parent` and records the weak back-reference used
/// for exception climbing. Idempotent.
pub(crate) fn attach_child(parent: &Task, child: &Task) {
    if Arc::ptr_eq(&parent.core, &child.core) {
        return;
    }
    {
        let mut inner = parent.core.lock();
        if !inner
            .children
            .iter()
            .any(|c| Arc::ptr_eq(&c.core, &child.core))
        {
            inner.children.push(child.clone());
            parent
                .core
                .publish_event(EventKind::ChildAttached)
                .with_child(child.name())
                .send();
        }
    }
    child.core.lock().parent = Some(WeakTask::new(parent));
}

/// Removes `child` from `parent`'s registry (child finished or was released).
pub(crate) fn remove_child(parent: &Task, child: &Task) {
    let mut inner = parent.core.lock();
    let before = inner.children.len();
    inner
        .children
        .retain(|c| !Arc::ptr_eq(&c.core, &child.core));
    if inner.children.len() != before {
        parent
            .core
            .publish_event(EventKind::ChildDetached)
            .with_child(child.name())
            .send();
    }
    if inner
        .rejoin
        .as_ref()
        .is_some_and(|r| Arc::ptr_eq(&r.core, &child.core))
    {
        inner.rejoin = None;
    }
}

/// Joins `child` on behalf of `core`'s executor.
///
/// Shows `Activity::Join`, arms the re-join marker so a join cut short by a
/// stop is repeated on continue, and restores `restore` afterwards.
pub(crate) async fn join_child_inner(core: &Arc<Core>, child: &Task, restore: Activity) {
    {
        let mut inner = core.lock();
        let is_child = inner
            .children
            .iter()
            .any(|c| Arc::ptr_eq(&c.core, &child.core));
        if is_child {
            inner.rejoin = Some(child.clone());
        }
        core.set_activity(&mut inner, Activity::Join);
    }
    let _ = child.join().await;
    {
        let mut inner = core.lock();
        core.set_activity(&mut inner, restore);
        if inner.state == State::Started || child.state() == State::Finished {
            inner.rejoin = None;
        }
    }
}
