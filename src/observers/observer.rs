//! # Observer: user-facing event handlers
//!
//! The [`Observer`] trait is the main **extension point** for end users who
//! want structured visibility instead of raw bus receivers. All lifecycle
//! [`Event`]s flow through the task's bus and into observers.
//!
//! Implementing your own observer allows you to plug in:
//! - metrics export (Prometheus, OpenTelemetry, …);
//! - custom monitoring or alerting pipelines;
//! - structured logging.
//!
//! # Example: custom observer
//! ```no_run
//! # #[cfg(feature = "events")]
//! # {
//! use taskchain::{Observer, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct MetricsObserver;
//!
//! #[async_trait]
//! impl Observer for MetricsObserver {
//!     async fn on_event(&self, event: &Event) {
//!         match event.kind {
//!             EventKind::TaskStarted => {
//!                 println!("[metrics] task started: {:?}", event.task);
//!             }
//!             EventKind::ActionFailed => {
//!                 println!("[metrics] task failed: {:?}, error={:?}", event.task, event.error);
//!             }
//!             _ => { /* ignore others */ }
//!         }
//!     }
//! }
//! # }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// # Trait for receiving lifecycle events from a task's bus.
///
/// Observers are called asynchronously whenever a new [`Event`] is
/// published. Typical use cases include:
/// - forwarding to metrics systems;
/// - triggering side effects;
/// - structured logging.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Called for every emitted [`Event`].
    async fn on_event(&self, event: &Event);
}
