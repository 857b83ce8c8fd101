//! # Action abstraction and function-backed action implementation.
//!
//! This module defines the [`Action`] trait (async, re-invocable) and a
//! convenient function-backed implementation [`ActionFn`]. The common handle
//! type is [`ActionRef`], an `Arc<dyn Action>` suitable for storing in links.
//!
//! An action receives a [`TaskContext`] through which it can start, run and
//! join child tasks; children started this way are registered with the
//! running task so stop/continue propagate to them.
//!
//! ## Rules
//! - **Re-invocable**: `invoke(&self)` may be called many times (repeating
//!   links, restarts). Each call creates a **new** future owning its own
//!   state; state shared between invocations lives behind an explicit
//!   `Arc<...>` inside the closure.
//! - **Opaque**: the library never preempts a running action; a stop request
//!   takes effect at the next suspension point after the action returns.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::core::TaskContext;
use crate::error::ActionError;
use crate::tasks::Control;

/// Boxed future returned by [`Action::invoke`].
///
/// This is a type alias for `Pin<Box<dyn Future<...>>>`:
/// - **Boxed**: required for trait objects (dynamic dispatch)
/// - **Pinned**: required for async futures
/// - **Send**: action futures run on whichever context drives the executor
pub type BoxActionFuture =
    Pin<Box<dyn Future<Output = Result<Control, ActionError>> + Send + 'static>>;

/// Shared handle to an action object.
pub type ActionRef = Arc<dyn Action>;

/// Asynchronous, re-invocable unit of user work.
///
/// An `Action` is one step's worth of behaviour. The executor invokes it,
/// awaits the returned future, and adapts the returned [`Control`] according
/// to the link kind (once / repeated / periodic).
///
/// # Example
/// ```
/// use taskchain::{Action, BoxActionFuture, Control, TaskContext};
///
/// struct Beep;
///
/// impl Action for Beep {
///     fn invoke(&self, _ctx: TaskContext) -> BoxActionFuture {
///         Box::pin(async move {
///             println!("beep");
///             Ok(Control::Done)
///         })
///     }
/// }
/// ```
pub trait Action: Send + Sync + 'static {
    /// Creates a new future that performs one invocation of the action.
    ///
    /// Takes `&self`: the same action object is invoked repeatedly across
    /// loop iterations and restarts, so implementations keep shared mutable
    /// state behind interior mutability.
    fn invoke(&self, ctx: TaskContext) -> BoxActionFuture;
}

/// # Function-backed action implementation.
///
/// Wraps a closure that *creates* a new future per invocation. No hidden
/// mutation between invocations; if the action needs state that survives
/// across calls, capture an `Arc<...>` explicitly.
///
/// Use [`ActionFn::arc`] for control-valued closures and [`ActionFn::unit`]
/// for plain `Result<(), ActionError>` closures (their result is mapped to
/// [`Control::Done`]).
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use taskchain::{ActionFn, Control};
///
/// let calls = Arc::new(AtomicU32::new(0));
/// let counting = ActionFn::arc(move |_ctx| {
///     let calls = calls.clone();
///     async move {
///         if calls.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
///             Ok(Control::Done)
///         } else {
///             Ok(Control::Again)
///         }
///     }
/// });
/// # let _ = counting;
/// ```
pub struct ActionFn<F> {
    f: F,
}

impl<F> ActionFn<F> {
    /// Creates a new function-backed action.
    ///
    /// Prefer [`ActionFn::arc`] when you immediately need an [`ActionRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a control-valued closure and returns it as a shared handle.
    pub fn arc<Fut>(f: F) -> ActionRef
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Control, ActionError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }

    /// Wraps a unit closure: its `Ok(())` is mapped to [`Control::Done`].
    ///
    /// # Example
    /// ```
    /// use taskchain::ActionFn;
    ///
    /// let hello = ActionFn::unit(|_ctx| async {
    ///     println!("hello");
    ///     Ok(())
    /// });
    /// # let _ = hello;
    /// ```
    pub fn unit<Fut>(f: F) -> ActionRef
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Arc::new(ActionFn::new(move |ctx: TaskContext| {
            let fut = f(ctx);
            async move { fut.await.map(|_| Control::Done) }
        }))
    }
}

impl<F, Fut> Action for ActionFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, ActionError>> + Send + 'static,
{
    fn invoke(&self, ctx: TaskContext) -> BoxActionFuture {
        let fut = (self.f)(ctx);
        Box::pin(fut)
    }
}

/// Action that does nothing.
///
/// Backs sleep links: the whole link is its post-action wait.
pub(crate) struct Noop;

impl Action for Noop {
    fn invoke(&self, _ctx: TaskContext) -> BoxActionFuture {
        Box::pin(async { Ok(Control::Done) })
    }
}
