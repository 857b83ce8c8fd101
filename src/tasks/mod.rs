//! # Task abstractions: data model and construction.
//!
//! This module provides the public task-related types:
//! - [`Task`] - handle to a chain of links and its state machine
//! - [`TaskBuilder`] - fluent construction of one-link tasks
//! - [`Action`], [`ActionFn`], [`ActionRef`] - the user work a link runs
//! - [`Control`] - the return protocol of repeating actions
//! - [`RepeatPolicy`] - cap/interval/netto configuration of loops
//! - [`State`], [`Activity`] - the observable lifecycle vocabulary
//! - [`Fault`], [`ExcHandler`], [`Hook`] - failure routing and hooks

mod action;
mod builder;
mod control;
pub(crate) mod link;
mod policy;
pub(crate) mod state;
mod task;

pub use action::{Action, ActionFn, ActionRef, BoxActionFuture};
pub use builder::TaskBuilder;
pub use control::Control;
pub use link::{ExcHandler, Fault, Hook};
pub use policy::RepeatPolicy;
pub use state::{Activity, State};
pub use task::{concat, Task};

pub(crate) use link::Link;
