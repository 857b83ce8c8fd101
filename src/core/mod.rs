//! # Scheduler core: state machine, executor, interruptible wait, tree routing.
//!
//! This module is the engine behind the public [`Task`](crate::Task) surface:
//!
//! - [`shared`] the lock-protected task body and its transition plumbing
//! - [`executor`] the chain walk, unwind and exception climb
//! - [`waiter`] the interruptible wait primitive
//! - [`context`] the handle actions use to route children
//!
//! ## System wiring
//! ```text
//!   Task (handle) ──► Core (one mutex: state, activity, chain, residuals,
//!        │                  children, parent, hooks)
//!        │                   │
//!   start/stop/cont/join     │ watch::Sender<Snapshot>  (join, hand-off)
//!        │                   │ Waiter                   (interruptible waits)
//!        ▼                   ▼
//!   executor::run ──► walk links ──► conclude (FINISHED / STOPPED)
//! ```

pub(crate) mod context;
pub(crate) mod executor;
pub(crate) mod shared;
mod waiter;

pub use context::TaskContext;
pub use waiter::Waiter;

pub(crate) use shared::Core;
