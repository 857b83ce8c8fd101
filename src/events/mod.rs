//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by task executors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: every root task owns a bus; its executor publishes on
//!   each lifecycle transition, failure, and tree change.
//! - **Consumers**: [`Task::subscribe`](crate::Task::subscribe) hands out raw
//!   receivers; [`Task::observe`](crate::Task::observe) drives an
//!   [`Observer`](crate::Observer).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
