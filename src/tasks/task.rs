//! # Task: the public handle to a chain and its state machine.
//!
//! A [`Task`] owns a chain of links and the machinery to run it: it can be
//! **started**, **stopped** (cooperatively, mid-flight), **continued** from
//! where it stopped, **joined** and **restarted**. Stop and continue
//! propagate to every child the task's actions started.
//!
//! Handles are cheap clones addressing the same task; use
//! [`Task::append`] / [`concat`] to splice chains together.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use taskchain::{ActionFn, Task};
//!
//! # async fn demo() -> Result<(), taskchain::TaskError> {
//! let hello = Task::once(ActionFn::unit(|_ctx| async {
//!     println!("hello,");
//!     Ok(())
//! }))
//! .with_duration(Duration::from_secs(2))
//! .build()?;
//!
//! let world = Task::once(ActionFn::unit(|_ctx| async {
//!     println!("world!");
//!     Ok(())
//! }))
//! .build()?;
//!
//! hello.append(world)?;
//! hello.start()?;
//! hello.join().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::core::executor::{self, Launch};
use crate::core::Core;
use crate::error::TaskError;
use crate::events::Event;
use crate::observers::Observer;
use crate::tasks::link::ExcHandler;
use crate::tasks::{Activity, Fault, State, TaskBuilder};
use crate::ActionError;

/// Handle to a task: a chain of links plus the state machine driving it.
///
/// Clones address the same task. A task consumed by [`Task::append`] keeps
/// rejecting its head operations with [`TaskError::InvalidState`].
#[derive(Clone)]
pub struct Task {
    pub(crate) core: Arc<Core>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Task {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// A task whose single link runs `action` exactly once.
    pub fn once(action: crate::tasks::ActionRef) -> TaskBuilder {
        TaskBuilder::once(action)
    }

    /// A task whose single link re-invokes `action` according to the
    /// [`Control`](crate::Control) values it returns.
    pub fn repeated(action: crate::tasks::ActionRef) -> TaskBuilder {
        TaskBuilder::repeated(action)
    }

    /// A task whose single link re-invokes `action` every `interval` until
    /// it returns [`Control::Done`](crate::Control::Done) or the cap set with
    /// [`TaskBuilder::with_num`] is reached.
    pub fn periodic(interval: Duration, action: crate::tasks::ActionRef) -> TaskBuilder {
        TaskBuilder::periodic(interval, action)
    }

    /// A task that just sleeps (interruptibly) for `duration`.
    pub fn sleep(duration: Duration) -> TaskBuilder {
        TaskBuilder::sleep(duration)
    }

    /// A task whose single link starts `child` as a child task.
    pub fn starts(child: &Task) -> TaskBuilder {
        TaskBuilder::starts(child, None, false)
    }

    /// Like [`Task::starts`], with a start delay for the child.
    pub fn starts_after(child: &Task, delay: Duration) -> TaskBuilder {
        TaskBuilder::starts(child, Some(delay), false)
    }

    /// A task whose single link starts `child` and joins it before the chain
    /// advances. The join is repeated on continue if a stop cut it short.
    pub fn runs(child: &Task) -> TaskBuilder {
        TaskBuilder::starts(child, None, true)
    }

    /// A task whose single link joins an already started `child`.
    pub fn joins(child: &Task) -> TaskBuilder {
        TaskBuilder::joins(child)
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// Starts the task on its own execution context.
    ///
    /// Accepted from CREATED, STOPPED (restart; residuals cleared) and
    /// FINISHED (restart); rejected with [`TaskError::InvalidState`] while an
    /// executor is attached or attaching, and on consumed tasks. The state is
    /// STARTED when this returns.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self) -> Result<(), TaskError> {
        self.accept_start(None)?;
        tokio::spawn(executor::run(self.core.clone(), Launch::Start));
        Ok(())
    }

    /// Starts the task, honouring `delay` before the first link's action.
    ///
    /// A stop during the delay preserves the remainder; a later continue
    /// waits it out before entering the chain.
    pub fn start_after(&self, delay: Duration) -> Result<(), TaskError> {
        self.accept_start(Some(delay))?;
        tokio::spawn(executor::run(self.core.clone(), Launch::Start));
        Ok(())
    }

    /// Starts the task threadless: the executor runs inline on the caller's
    /// context, and this returns once the task reached STOPPED or FINISHED.
    ///
    /// `join()` works normally on inline tasks (it observes the state
    /// machine, not an execution context).
    pub async fn run_inline(&self) -> Result<(), TaskError> {
        self.accept_start(None)?;
        executor::run(self.core.clone(), Launch::Start).await;
        self.error_result()
    }

    /// Requests a cooperative stop.
    ///
    /// Children are told to stop first, then the task itself enters TO_STOP;
    /// the executor observes the request at its next suspension point,
    /// records the residual of an interrupted wait, fires `on_stop` and
    /// parks in STOPPED. No-op in TO_STOP/STOPPED/FINISHED; rejected in
    /// CREATED.
    pub fn stop(&self) -> Result<(), TaskError> {
        let children = {
            let inner = self.core.lock();
            if inner.consumed {
                return Err(TaskError::invalid_state("stop", inner.state));
            }
            match inner.state {
                State::Created => {
                    return Err(TaskError::invalid_state("stop", State::Created))
                }
                State::ToStop | State::Stopped | State::Finished => return Ok(()),
                State::Started | State::ToContinue => {}
            }
            inner.children.clone()
        };
        // Children first, so the parent's unwind finds them already stopping.
        for child in children {
            let _ = child.stop();
        }
        let mut inner = self.core.lock();
        if matches!(inner.state, State::Started | State::ToContinue) {
            inner.stopped_at = Some(Instant::now());
            self.core.set_state(&mut inner, State::ToStop);
            if inner.activity == Activity::Sleep {
                self.core.waiter.interrupt();
            }
        }
        Ok(())
    }

    /// Continues a stopped task from where it stopped.
    ///
    /// From STOPPED the task enters TO_CONTINUE and a fresh executor
    /// re-attaches at the cursor; from TO_STOP the executor first waits for
    /// the unwind to park in STOPPED (join-then-proceed); in FINISHED this is
    /// a silent no-op. Rejected while another start/continue is pending and
    /// after a run that ended with an unhandled action failure.
    pub fn cont(&self) -> Result<(), TaskError> {
        self.accept_cont(None)
    }

    /// Continues a stopped task after an extra delay.
    ///
    /// The delay replaces any residual start/continue delay and additionally
    /// shifts pending durations, so the resumed schedule stays coherent.
    pub fn cont_after(&self, delay: Duration) -> Result<(), TaskError> {
        self.accept_cont(Some(delay))
    }

    /// Waits until the task is at rest: CREATED, STOPPED or FINISHED, with
    /// no start/continue executor attaching.
    ///
    /// Surfaces the unhandled failure of the last run, if any, as
    /// [`TaskError::ActionFailed`].
    pub async fn join(&self) -> Result<(), TaskError> {
        {
            let inner = self.core.lock();
            if inner.consumed {
                return Err(TaskError::invalid_state("join", inner.state));
            }
        }
        let mut rx = self.core.watch();
        loop {
            let snap = *rx.borrow_and_update();
            if !snap.attaching && !snap.state.is_active() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        self.error_result()
    }

    // -----------------------------------------------------------------------
    // Composition
    // -----------------------------------------------------------------------

    /// Splices `other`'s chain onto the tail of this one.
    ///
    /// Both tasks must be at rest. `other` is consumed: the links move here,
    /// its per-link exception handlers travel with them, its head hooks are
    /// dropped, and its own head operations keep failing with
    /// [`TaskError::InvalidState`]. Appending a task to itself is rejected.
    pub fn append(&self, other: Task) -> Result<(), TaskError> {
        if Arc::ptr_eq(&self.core, &other.core) {
            return Err(TaskError::invalid_argument(
                "cannot append a task to itself",
            ));
        }
        // Two-task critical section; order by address so concurrent appends
        // cannot deadlock.
        let (first, second) = if Arc::as_ptr(&self.core) < Arc::as_ptr(&other.core) {
            (&self.core, &other.core)
        } else {
            (&other.core, &self.core)
        };
        let mut first_guard = first.lock();
        let mut second_guard = second.lock();
        let (me, donor) = if Arc::ptr_eq(first, &self.core) {
            (&mut first_guard, &mut second_guard)
        } else {
            (&mut second_guard, &mut first_guard)
        };
        if me.consumed || !me.writable() {
            return Err(TaskError::invalid_state("append", me.state));
        }
        if donor.consumed || !donor.writable() {
            return Err(TaskError::invalid_state("append", donor.state));
        }
        let mut links = std::mem::take(&mut donor.links);
        for link in &mut links {
            link.reset();
        }
        me.links.append(&mut links);
        donor.consumed = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    /// Human-readable task name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.core.lock().state
    }

    /// Current fine-grained activity.
    pub fn activity(&self) -> Activity {
        self.core.lock().activity
    }

    /// Consistent `(state, activity)` snapshot under one lock acquisition.
    pub fn status(&self) -> (State, Activity) {
        let inner = self.core.lock();
        (inner.state, inner.activity)
    }

    /// The head link's post-action duration.
    pub fn duration(&self) -> Option<Duration> {
        self.core.lock().links.first().and_then(|l| l.duration)
    }

    /// Unhandled failure of the last run, if any.
    pub fn error(&self) -> Option<Arc<ActionError>> {
        self.core.lock().error.as_ref().map(|(_, e)| e.clone())
    }

    /// Snapshot of the currently registered children.
    pub fn children(&self) -> Vec<Task> {
        self.core.lock().children.clone()
    }

    // -----------------------------------------------------------------------
    // Observability
    // -----------------------------------------------------------------------

    /// Subscribes to this task's lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.core.bus.subscribe()
    }

    /// Attaches an observer: spawns a listener that forwards every event.
    ///
    /// The listener exits when the task (and with it the bus) is dropped.
    pub fn observe(&self, observer: Arc<dyn Observer>) {
        let mut rx = self.core.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => observer.on_event(&ev).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // -----------------------------------------------------------------------
    // Writers (guarded: CREATED / STOPPED / FINISHED only)
    // -----------------------------------------------------------------------

    /// Sets the head link's post-action duration.
    pub fn set_duration(&self, duration: Option<Duration>) -> Result<(), TaskError> {
        self.write(|inner| {
            if let Some(link) = inner.links.first_mut() {
                link.duration = duration;
            }
        })
    }

    /// Sets the hook fired when the chain is entered.
    pub fn set_on_start<F>(&self, hook: F) -> Result<(), TaskError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write(|inner| inner.on_start = Some(Arc::new(hook)))
    }

    /// Sets the hook fired when a stop cycle closes.
    pub fn set_on_stop<F>(&self, hook: F) -> Result<(), TaskError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write(|inner| inner.on_stop = Some(Arc::new(hook)))
    }

    /// Sets the hook fired when a continue cycle opens.
    pub fn set_on_cont<F>(&self, hook: F) -> Result<(), TaskError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write(|inner| inner.on_cont = Some(Arc::new(hook)))
    }

    /// Sets the hook fired when the task finishes naturally.
    pub fn set_on_final<F>(&self, hook: F) -> Result<(), TaskError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.write(|inner| inner.on_final = Some(Arc::new(hook)))
    }

    /// Sets the head link's exception handler.
    pub fn set_exc_handler<F>(&self, handler: F) -> Result<(), TaskError>
    where
        F: Fn(&Fault) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        let handler: ExcHandler = Arc::new(handler);
        self.write(move |inner| {
            if let Some(link) = inner.links.first_mut() {
                link.exc_handler = Some(handler.clone());
            }
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn accept_start(&self, delay: Option<Duration>) -> Result<(), TaskError> {
        let mut inner = self.core.lock();
        if inner.consumed || inner.attaching || inner.state.is_active() {
            return Err(TaskError::invalid_state("start", inner.state));
        }
        if matches!(inner.state, State::Stopped | State::Finished) {
            inner.reset_run();
        }
        inner.error = None;
        inner.resume_delay = delay.filter(|d| !d.is_zero());
        inner.delay_called_at = Some(Instant::now());
        inner.attaching = true;
        self.core.set_state(&mut inner, State::Started);
        Ok(())
    }

    fn accept_cont(&self, delay: Option<Duration>) -> Result<(), TaskError> {
        let wait_stopped = {
            let mut inner = self.core.lock();
            if inner.consumed || inner.attaching {
                return Err(TaskError::invalid_state("cont", inner.state));
            }
            match inner.state {
                State::Finished => return Ok(()),
                State::Stopped | State::ToStop => {}
                state => return Err(TaskError::invalid_state("cont", state)),
            }
            if inner.error.is_some() {
                drop(inner);
                return Err(self.error_result().unwrap_err());
            }
            let now = Instant::now();
            // Shift pending durations by the stop-to-cont gap (plus the extra
            // delay), so only the interrupted remainder is re-waited.
            if let (Some(anchor), Some(stopped_at)) = (inner.anchor, inner.stopped_at) {
                inner.anchor =
                    Some(anchor + (now - stopped_at) + delay.unwrap_or(Duration::ZERO));
            }
            inner.stopped_at = None;
            if let Some(d) = delay.filter(|d| !d.is_zero()) {
                inner.resume_delay = Some(d);
            }
            inner.delay_called_at = Some(now);
            inner.attaching = true;
            match inner.state {
                State::Stopped => {
                    self.core.set_state(&mut inner, State::ToContinue);
                    false
                }
                _ => {
                    self.core.publish_watch(&inner);
                    true
                }
            }
        };
        tokio::spawn(executor::run(
            self.core.clone(),
            Launch::Cont { wait_stopped },
        ));
        Ok(())
    }

    pub(crate) fn error_result(&self) -> Result<(), TaskError> {
        let inner = self.core.lock();
        match &inner.error {
            Some((link, error)) => Err(TaskError::ActionFailed {
                task: self.core.name.clone(),
                link: *link,
                reason: error.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn write<F>(&self, mutate: F) -> Result<(), TaskError>
    where
        F: FnOnce(&mut crate::core::shared::Inner),
    {
        let mut inner = self.core.lock();
        if inner.consumed || !inner.writable() {
            return Err(TaskError::invalid_state("configure", inner.state));
        }
        mutate(&mut inner);
        Ok(())
    }
}

/// Concatenates tasks into one chain: a left fold of [`Task::append`].
///
/// Returns the first task, now owning every link.
///
/// # Example
/// ```no_run
/// use taskchain::{concat, ActionFn, Task};
///
/// # fn demo() -> Result<(), taskchain::TaskError> {
/// let a = Task::once(ActionFn::unit(|_| async { Ok(()) })).build()?;
/// let b = Task::once(ActionFn::unit(|_| async { Ok(()) })).build()?;
/// let c = Task::once(ActionFn::unit(|_| async { Ok(()) })).build()?;
/// let chain = concat(a, [b, c])?;
/// chain.start()?;
/// # Ok(())
/// # }
/// ```
pub fn concat<I>(first: Task, rest: I) -> Result<Task, TaskError>
where
    I: IntoIterator<Item = Task>,
{
    for task in rest {
        first.append(task)?;
    }
    Ok(first)
}
