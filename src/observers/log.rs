use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observer;

/// Base observer that logs events to stdout.
///
/// Enabled via the `logging` feature. Useful for demos and debugging.
pub struct LogWriter;

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TaskStarted => {
                println!("[started] task={:?}", e.task);
            }
            EventKind::TaskStopped => {
                println!("[stopped] task={:?} link={:?}", e.task, e.link);
            }
            EventKind::TaskContinued => {
                println!("[continued] task={:?} link={:?}", e.task, e.link);
            }
            EventKind::TaskFinished => {
                println!("[finished] task={:?}", e.task);
            }
            EventKind::ActionFailed => {
                println!(
                    "[failed] task={:?} link={:?} err={:?}",
                    e.task, e.link, e.error
                );
            }
            EventKind::ChildAttached => {
                println!("[child-attached] task={:?} child={:?}", e.task, e.child);
            }
            EventKind::ChildDetached => {
                println!("[child-detached] task={:?} child={:?}", e.task, e.child);
            }
        }
    }
}
