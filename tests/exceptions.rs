mod common;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{always_fails, fails_once, note, Recorder};
use taskchain::{concat, ActionError, State, Task, TaskError};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn link_handler_swallows_and_the_chain_proceeds() -> TestResult {
    let rec = Recorder::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let chain = {
        let calls = calls.clone();
        concat(
            Task::once(always_fails("boom"))
                .exc_handler(move |fault| {
                    assert_eq!(fault.link, 0);
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()?,
            [Task::once(note(&rec, "next")).build()?],
        )?
    };

    chain.start()?;
    chain.join().await?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(chain.state(), State::Finished);
    assert!(chain.error().is_none());
    assert_eq!(rec.labels(), ["next"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn head_handler_covers_links_without_their_own() -> TestResult {
    let rec = Recorder::new();
    let faults = Arc::new(std::sync::Mutex::new(Vec::new()));
    let chain = {
        let faults = faults.clone();
        concat(
            Task::once(note(&rec, "first"))
                .exc_handler(move |fault| {
                    faults
                        .lock()
                        .expect("faults mutex")
                        .push((fault.task.clone(), fault.link));
                    Ok(())
                })
                .build()?,
            [
                Task::once(always_fails("second blew up")).build()?,
                Task::once(note(&rec, "third")).build()?,
            ],
        )?
    };

    chain.start()?;
    chain.join().await?;

    assert_eq!(chain.state(), State::Finished);
    assert_eq!(rec.labels(), ["first", "third"]);
    let faults = faults.lock().expect("faults mutex").clone();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].1, 1); // the failing link's index, reported upward
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn default_handler_stops_the_tree_and_records_the_failure() -> TestResult {
    let rec = Recorder::new();
    let child = concat(
        Task::once(always_fails("child exploded"))
            .with_name("bad-child")
            .build()?,
        [Task::once(note(&rec, "child_sibling")).build()?],
    )?;
    let parent = concat(
        Task::runs(&child).with_name("parent").build()?,
        [Task::once(note(&rec, "parent_sibling")).build()?],
    )?;

    parent.start()?;
    parent.join().await?;

    // The default handler at the topmost task stopped the whole tree.
    assert_eq!(parent.state(), State::Stopped);
    assert_eq!(child.state(), State::Stopped);
    assert!(rec.labels().is_empty());

    // The failure is recorded on the failing task with its link index.
    match child.join().await {
        Err(TaskError::ActionFailed { task, link, reason }) => {
            assert_eq!(task, "bad-child");
            assert_eq!(link, 0);
            assert!(reason.contains("child exploded"));
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
    // A failed run cannot be continued...
    assert!(child.cont().is_err());
    assert!(child.error().is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn parent_head_handler_catches_a_grandchild_failure() -> TestResult {
    let rec = Recorder::new();
    let handled = Arc::new(AtomicUsize::new(0));

    let grandchild = Task::once(always_fails("deep failure"))
        .with_name("grandchild")
        .build()?;
    let middle = Task::runs(&grandchild).with_name("middle").build()?;

    let parent = {
        let handled = handled.clone();
        let stopper: Arc<std::sync::Mutex<Option<Task>>> =
            Arc::new(std::sync::Mutex::new(None));
        let stopper_for_handler = stopper.clone();
        let parent = concat(
            Task::runs(&middle)
                .with_name("parent")
                .exc_handler(move |fault| {
                    assert_eq!(fault.task, "grandchild");
                    handled.fetch_add(1, Ordering::SeqCst);
                    if let Some(p) = stopper_for_handler
                        .lock()
                        .expect("stopper mutex")
                        .as_ref()
                    {
                        let _ = p.stop();
                    }
                    Ok(())
                })
                .build()?,
            [Task::once(note(&rec, "parent_sibling")).build()?],
        )?;
        *stopper.lock().expect("stopper mutex") = Some(parent.clone());
        parent
    };

    parent.start()?;
    parent.join().await?;

    // The highest explicit handler on the climb path ran exactly once...
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    // ...stopped the parent, and no sibling action ran anywhere.
    assert_eq!(parent.state(), State::Stopped);
    // The swallowed failure let the inner tasks run their (exhausted) chains
    // to completion: a stop that lands after the last link finishes them.
    assert_eq!(middle.state(), State::Finished);
    assert_eq!(grandchild.state(), State::Finished);
    assert!(rec.labels().is_empty());
    // The grandchild's failure was swallowed by the handler: no record.
    assert!(grandchild.error().is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn handler_reraise_unwinds_with_the_new_error() -> TestResult {
    let task = Task::once(always_fails("original"))
        .with_name("reraiser")
        .exc_handler(|_fault| Err(ActionError::fail("escalated")))
        .build()?;

    task.start()?;
    match task.join().await {
        Err(TaskError::ActionFailed { reason, .. }) => {
            assert!(reason.contains("escalated"));
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
    assert_eq!(task.state(), State::Stopped);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_hook_still_fires_on_a_defaulted_failure() -> TestResult {
    let rec = Recorder::new();
    let task = Task::once(always_fails("boom"))
        .with_name("failing")
        .on_stop(rec.hook("on_stop"))
        .build()?;

    task.start()?;
    let _ = task.join().await;
    assert_eq!(task.state(), State::Stopped);
    assert_eq!(rec.labels(), ["on_stop"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restart_clears_a_recorded_failure() -> TestResult {
    let rec = Recorder::new();
    let task = Task::repeated(fails_once(&rec, "recovered"))
        .with_name("flaky")
        .build()?;

    task.start()?;
    assert!(task.join().await.is_err());
    assert_eq!(task.state(), State::Stopped);

    task.start()?;
    task.join().await?;
    assert_eq!(task.state(), State::Finished);
    assert!(task.error().is_none());
    assert_eq!(rec.labels(), ["recovered"]);
    Ok(())
}
