//! # taskchain
//!
//! **Taskchain** organizes user-supplied actions into composable,
//! interruptible, restartable execution units called *tasks*. Each task owns
//! a chain of links and may spawn child tasks, forming a forest; every task
//! can be started, stopped cooperatively mid-flight, continued from where it
//! stopped, joined and restarted. Stop and continue propagate from a task to
//! all of its descendants.
//!
//! ## Features
//!
//! | Area               | Description                                                         | Key types / traits                  |
//! |--------------------|---------------------------------------------------------------------|-------------------------------------|
//! | **Tasks**          | Build once/repeated/periodic/sleep tasks, splice them into chains.  | [`Task`], [`TaskBuilder`], [`concat`] |
//! | **Actions**        | Define the work of a link as a closure or trait object.             | [`Action`], [`ActionFn`], [`Control`] |
//! | **Lifecycle**      | Start, stop, continue, join, restart; residual delays survive stops. | [`State`], [`Activity`]             |
//! | **Trees**          | Actions start children; stop/cont/failures route across the tree.   | [`TaskContext`]                     |
//! | **Waits**          | Interruptible delays on the steady clock.                           | [`Waiter`]                          |
//! | **Failures**       | Per-link handlers with climbing; typed misuse errors.               | [`Fault`], [`TaskError`], [`ActionError`] |
//! | **Observability**  | Per-task lifecycle event stream (hooks stay user code).             | [`Observer`]                        |
//!
//! ## Optional features
//! - `events`: exports [`Event`], [`EventKind`] and [`Bus`] for advanced integrations.
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## State machine
//!
//! ```text
//! CREATED ──start──► STARTED ──chain exhausted──► FINISHED ──start──► (restart)
//!                      │  ▲
//!                 stop │  │ executor attached
//!                      ▼  │
//!                  TO_STOP │
//!                      │   │
//!     executor unwinds ▼   │
//!                  STOPPED ──cont──► TO_CONTINUE
//!                      └────────────────start──► (restart, residuals cleared)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use taskchain::{ActionFn, Task};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), taskchain::TaskError> {
//!     // [ print "hello," ── 2s ]──[ print "world!" ]
//!     let hello = Task::once(ActionFn::unit(|_ctx| async {
//!         println!("hello,");
//!         Ok(())
//!     }))
//!     .with_duration(Duration::from_secs(2))
//!     .build()?;
//!
//!     let world = Task::once(ActionFn::unit(|_ctx| async {
//!         println!("world!");
//!         Ok(())
//!     }))
//!     .build()?;
//!
//!     hello.append(world)?;
//!
//!     hello.start()?;
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!     hello.stop()?;                       // interrupts the 2s wait, 1s remains
//!     hello.join().await?;
//!     hello.cont()?;                       // re-waits exactly the remainder
//!     hello.join().await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod core;
mod error;
mod events;
mod observers;
mod tasks;

// ---- Public re-exports ----

pub use self::core::{TaskContext, Waiter};
pub use error::{ActionError, TaskError};
pub use observers::Observer;
pub use tasks::{
    concat, Action, ActionFn, ActionRef, Activity, BoxActionFuture, Control, ExcHandler, Fault,
    Hook, RepeatPolicy, State, Task, TaskBuilder,
};

// Optional: expose event types.
// Enable with: `--features events`
#[cfg(feature = "events")]
pub use events::{Bus, Event, EventKind};

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
