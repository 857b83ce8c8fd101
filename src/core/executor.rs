//! # Chain executor.
//!
//! One executor drives one run of a task: it walks the chain from the
//! cursor, runs each link's action, applies the link's timing rule, and
//! advances. Stop requests become visible to it only at suspension points
//! (between links, inside interruptible waits, inside child joins); user
//! actions themselves are opaque.
//!
//! ```text
//!   start()/cont()                 walk()
//!        │                           │
//!        ▼                           ▼
//!   [resume delay] ──► [hook] ──► ┌─────────────────────────────┐
//!                                 │ gap residual → action →     │
//!                                 │ control → duration → advance│──► conclude()
//!                                 └─────────────────────────────┘      │
//!                                          ▲                           ▼
//!                                          └── cont() re-attaches   FINISHED /
//!                                              at the cursor        STOPPED
//! ```
//!
//! `conclude()` is the single unwind point: it quiesces children, decides
//! between FINISHED and STOPPED, fires the closing hook and publishes the
//! terminal state. All residual bookkeeping (interrupted gaps, pending
//! durations, remaining delays) is written back before the state flips, so a
//! later continue resumes exactly where the run left off.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::core::context::{attach_child, join_child_inner, remove_child};
use crate::core::shared::Core;
use crate::error::ActionError;
use crate::events::EventKind;
use crate::tasks::link::{Link, LinkKind};
use crate::tasks::{ActionRef, Activity, Control, Fault, State, Task};

/// How this executor was launched.
pub(crate) enum Launch {
    /// Fresh start (also restart from STOPPED/FINISHED).
    Start,
    /// Continuation of a stopped task. With `wait_stopped`, the previous
    /// executor is still unwinding and must be waited out first
    /// (join-then-proceed).
    Cont { wait_stopped: bool },
}

/// Drives one run of the task to STOPPED or FINISHED.
pub(crate) async fn run(core: Arc<Core>, launch: Launch) {
    match launch {
        Launch::Start => start_path(&core).await,
        Launch::Cont { wait_stopped } => cont_path(&core, wait_stopped).await,
    }
}

// ---------------------------------------------------------------------------
// Launch paths
// ---------------------------------------------------------------------------

async fn start_path(core: &Arc<Core>) {
    if !delay_step(core).await {
        return conclude(core).await;
    }
    enter_chain(core).await
}

/// Opens the run: fires `on_start`, anchors the schedule, walks the chain.
///
/// Also the landing point of a continue that never got past the start delay:
/// the start hook fires then, not `on_cont`.
async fn enter_chain(core: &Arc<Core>) {
    let hook = {
        let mut inner = core.lock();
        if inner.state == State::ToStop {
            None
        } else {
            inner.begun = true;
            inner.active = true;
            Some(inner.on_start.clone())
        }
    };
    let hook = match hook {
        Some(hook) => hook,
        None => return conclude(core).await,
    };
    if let Some(h) = hook {
        h();
    }
    core.publish_event(EventKind::TaskStarted).send();
    {
        let mut inner = core.lock();
        inner.anchor = Some(Instant::now());
        core.set_attaching(&mut inner, false);
    }
    walk(core).await
}

async fn cont_path(core: &Arc<Core>, wait_stopped: bool) {
    if wait_stopped {
        // Join-then-proceed: wait for the unwinding executor to publish its
        // terminal state before taking over.
        let mut rx = core.watch();
        loop {
            let snap = *rx.borrow_and_update();
            if matches!(snap.state, State::Stopped | State::Finished) {
                break;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
        let mut inner = core.lock();
        // Finished while we waited, or the run died with an unhandled
        // failure: nothing to continue.
        if inner.state == State::Finished || inner.error.is_some() {
            core.set_attaching(&mut inner, false);
            return;
        }
        core.set_state(&mut inner, State::ToContinue);
    }

    // Take over: TO_CONTINUE → STARTED, unless a stop got in first.
    enum TakeOver {
        Proceed,
        Stop,
        Abort,
    }
    let take_over = {
        let mut inner = core.lock();
        match inner.state {
            State::ToContinue => {
                core.set_state(&mut inner, State::Started);
                core.set_attaching(&mut inner, false);
                TakeOver::Proceed
            }
            State::ToStop => TakeOver::Stop,
            state => {
                debug_assert!(false, "continuation attached in {state:?}");
                core.set_attaching(&mut inner, false);
                TakeOver::Abort
            }
        }
    };
    match take_over {
        TakeOver::Proceed => {}
        TakeOver::Stop => return conclude(core).await,
        TakeOver::Abort => return,
    }

    if !delay_step(core).await {
        return conclude(core).await;
    }

    // A stop before the chain was ever entered leaves nothing to re-open:
    // re-enter the start path instead.
    let begun = core.lock().begun;
    if !begun {
        return enter_chain(core).await;
    }

    let hook_cursor = {
        let mut inner = core.lock();
        if inner.state == State::ToStop {
            None
        } else {
            inner.active = true;
            Some((inner.on_cont.clone(), inner.cursor))
        }
    };
    let (hook, cursor) = match hook_cursor {
        Some(pair) => pair,
        None => return conclude(core).await,
    };
    if let Some(h) = hook {
        h();
    }
    core.publish_event(EventKind::TaskContinued)
        .with_link(cursor)
        .send();

    // Children first: wake the ones this task's stop put to sleep, and
    // repeat a join that the stop cut short.
    let (stopped_children, rejoin) = {
        let inner = core.lock();
        let stopped: Vec<Task> = inner
            .children
            .iter()
            .filter(|c| c.state() == State::Stopped)
            .cloned()
            .collect();
        (stopped, inner.rejoin.clone())
    };
    for child in stopped_children {
        let _ = child.cont();
    }
    if let Some(child) = rejoin {
        join_child_inner(core, &child, Activity::None).await;
        if core.lock().state == State::ToStop {
            return conclude(core).await;
        }
    }

    walk(core).await
}

// ---------------------------------------------------------------------------
// The walk
// ---------------------------------------------------------------------------

/// One decision of the walk loop, made under the lock.
enum Step {
    Conclude,
    Gap(Duration),
    DurationWait(Duration),
    Invoke(ActionRef),
    StartChild {
        child: Task,
        delay: Option<Duration>,
        join: bool,
    },
    JoinChild {
        child: Task,
    },
}

async fn walk(core: &Arc<Core>) {
    loop {
        let step = {
            let mut inner = core.lock();
            if inner.state == State::ToStop || inner.cursor >= inner.links.len() {
                Step::Conclude
            } else {
                let cursor = inner.cursor;
                let anchor = inner.anchor.unwrap_or_else(Instant::now);
                let link = &mut inner.links[cursor];
                if let Some(gap) = link.gap_rest {
                    Step::Gap(gap)
                } else if link.duration_rest {
                    let due = anchor + link.duration.unwrap_or_default();
                    Step::DurationWait(due.saturating_duration_since(Instant::now()))
                } else {
                    match &link.kind {
                        LinkKind::StartChild { child, delay, join } => Step::StartChild {
                            child: child.clone(),
                            delay: *delay,
                            join: *join,
                        },
                        LinkKind::JoinChild { child } => Step::JoinChild {
                            child: child.clone(),
                        },
                        _ => Step::Invoke(link.action.clone()),
                    }
                }
            }
        };

        match step {
            Step::Conclude => return conclude(core).await,

            Step::Gap(gap) => match sleep_step(core, gap).await {
                WaitOutcome::Done => {
                    let mut inner = core.lock();
                    let cursor = inner.cursor;
                    inner.links[cursor].gap_rest = None;
                }
                WaitOutcome::Interrupted(rem) => {
                    // Preserve the countdown; the loop top unwinds next.
                    let mut inner = core.lock();
                    let cursor = inner.cursor;
                    inner.links[cursor].gap_rest = (!rem.is_zero()).then_some(rem);
                }
            },

            Step::DurationWait(rest) => {
                if rest.is_zero() {
                    advance(core);
                    continue;
                }
                match sleep_step(core, rest).await {
                    WaitOutcome::Done => advance(core),
                    WaitOutcome::Interrupted(_) => {
                        // The remaining time is re-derived from the shifted
                        // anchor on continue; nothing to store unless the
                        // wait in fact ran out.
                        let inner = core.lock();
                        let cursor = inner.cursor;
                        let due = inner.anchor.unwrap_or_else(Instant::now)
                            + inner.links[cursor].duration.unwrap_or_default();
                        if due.saturating_duration_since(Instant::now()).is_zero() {
                            drop(inner);
                            advance(core);
                        }
                    }
                }
            }

            Step::Invoke(action) => invoke_step(core, action).await,

            Step::StartChild { child, delay, join } => {
                let started = Instant::now();
                let me = Task { core: core.clone() };
                attach_child(&me, &child);
                let res = match delay {
                    Some(d) => child.start_after(d),
                    None => child.start(),
                };
                // A stop may have snapshotted the children before this one
                // was registered; route it through now.
                if me.state() == State::ToStop {
                    let _ = child.stop();
                }
                let result = match res {
                    Err(e) => Err(ActionError::from(e)),
                    Ok(()) => {
                        if join {
                            join_child_inner(core, &child, Activity::None).await;
                        }
                        Ok(Control::Done)
                    }
                };
                settle_invocation(core, result, started.elapsed());
            }

            Step::JoinChild { child } => {
                let started = Instant::now();
                join_child_inner(core, &child, Activity::None).await;
                settle_invocation(core, Ok(Control::Done), started.elapsed());
            }
        }
    }
}

/// Runs one plain action invocation: BUSY around the await, then settle.
async fn invoke_step(core: &Arc<Core>, action: ActionRef) {
    let ctx = crate::core::TaskContext::new(Task { core: core.clone() });
    {
        let mut inner = core.lock();
        core.set_activity(&mut inner, Activity::Busy);
    }
    let started = Instant::now();
    let result = action.invoke(ctx).await;
    let elapsed = started.elapsed();
    {
        let mut inner = core.lock();
        core.set_activity(&mut inner, Activity::None);
    }
    settle_invocation(core, result, elapsed);
}

/// Books one invocation: failure climb, control adaptation, loop/advance.
fn settle_invocation(core: &Arc<Core>, result: Result<Control, ActionError>, elapsed: Duration) {
    {
        let mut inner = core.lock();
        let cursor = inner.cursor;
        inner.links[cursor].cnt += 1;
    }
    let control = match result {
        Ok(control) => control,
        Err(error) => {
            let link_idx = core.lock().cursor;
            match climb(core, link_idx, Arc::new(error)) {
                ClimbOutcome::Swallowed => Control::Done,
                // Stop already initiated; the loop top unwinds.
                ClimbOutcome::Unwound => return,
            }
        }
    };

    let mut inner = core.lock();
    let cursor = inner.cursor;
    match adapt(&inner.links[cursor], control, elapsed) {
        Phase::Terminate => {
            inner.links[cursor].cnt = 0;
            if inner.links[cursor].duration.is_some() {
                inner.links[cursor].duration_rest = true;
            } else {
                drop(inner);
                advance(core);
            }
        }
        Phase::Immediate => {}
        Phase::Gap(gap) => inner.links[cursor].gap_rest = Some(gap),
    }
}

/// What the action phase of a link does next.
enum Phase {
    /// The link's action phase is complete.
    Terminate,
    /// Re-invoke without waiting.
    Immediate,
    /// Re-invoke after a gap.
    Gap(Duration),
}

/// Adapts the returned control value per link kind.
fn adapt(link: &Link, control: Control, elapsed: Duration) -> Phase {
    match &link.kind {
        LinkKind::Once | LinkKind::StartChild { .. } | LinkKind::JoinChild { .. } => {
            Phase::Terminate
        }
        LinkKind::Repeated(policy) => {
            if control.is_done() || policy.exhausted(link.cnt) {
                return Phase::Terminate;
            }
            match control {
                Control::Again => Phase::Immediate,
                Control::After(gap) => {
                    let gap = policy.next_gap(gap, elapsed);
                    if gap.is_zero() {
                        Phase::Immediate
                    } else {
                        Phase::Gap(gap)
                    }
                }
                Control::Done => unreachable!("handled above"),
            }
        }
        LinkKind::Periodic(policy) => {
            if control.is_done() || policy.exhausted(link.cnt) {
                return Phase::Terminate;
            }
            let gap = policy.next_gap(policy.interval.unwrap_or_default(), elapsed);
            if gap.is_zero() {
                Phase::Immediate
            } else {
                Phase::Gap(gap)
            }
        }
    }
}

/// Moves the cursor to the next link and shifts the schedule anchor.
fn advance(core: &Arc<Core>) {
    let mut inner = core.lock();
    let cursor = inner.cursor;
    let link = &mut inner.links[cursor];
    link.cnt = 0;
    link.gap_rest = None;
    link.duration_rest = false;
    let duration = link.duration;
    inner.cursor += 1;
    inner.anchor = match duration {
        // Durations pin the grid: the next link is scheduled relative to the
        // previous schedule, not to however long bookkeeping took.
        Some(d) => Some(inner.anchor.unwrap_or_else(Instant::now) + d),
        None => Some(Instant::now()),
    };
}

// ---------------------------------------------------------------------------
// Waits
// ---------------------------------------------------------------------------

enum WaitOutcome {
    /// The full time elapsed.
    Done,
    /// A stop request cut the wait short; the remainder is reported.
    Interrupted(Duration),
}

/// One interruptible wait with the SLEEP activity shown.
///
/// Stale interrupt permits (a stop that raced a completed wait) surface as a
/// wakeup with time remaining but no stop pending; those re-wait the
/// remainder, so the contract stays exact.
async fn sleep_step(core: &Arc<Core>, dur: Duration) -> WaitOutcome {
    {
        let mut inner = core.lock();
        if inner.state == State::ToStop {
            return WaitOutcome::Interrupted(dur);
        }
        core.set_activity(&mut inner, Activity::Sleep);
    }
    let mut rest = dur;
    loop {
        let rem = core.waiter.wait(rest).await;
        let mut inner = core.lock();
        if inner.state == State::ToStop {
            core.set_activity(&mut inner, Activity::None);
            return WaitOutcome::Interrupted(rem);
        }
        if rem.is_zero() {
            core.set_activity(&mut inner, Activity::None);
            return WaitOutcome::Done;
        }
        rest = rem;
    }
}

/// Waits out a pending start/continue delay.
///
/// Returns `false` when a stop interrupted the delay; the remainder is
/// preserved for the next continue.
async fn delay_step(core: &Arc<Core>) -> bool {
    let rest = {
        let inner = core.lock();
        match inner.resume_delay {
            None => return true,
            Some(d) => {
                let elapsed = inner
                    .delay_called_at
                    .map(|t| t.elapsed())
                    .unwrap_or_default();
                d.saturating_sub(elapsed)
            }
        }
    };
    let outcome = if rest.is_zero() {
        WaitOutcome::Done
    } else {
        sleep_step(core, rest).await
    };
    match outcome {
        WaitOutcome::Done => {
            let mut inner = core.lock();
            inner.resume_delay = None;
            inner.delay_called_at = None;
            true
        }
        WaitOutcome::Interrupted(rem) => {
            let mut inner = core.lock();
            inner.resume_delay = (!rem.is_zero()).then_some(rem);
            inner.delay_called_at = None;
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Unwind
// ---------------------------------------------------------------------------

/// The single unwind point: quiesce children, decide FINISHED vs STOPPED,
/// fire the closing hook, publish the terminal state.
async fn conclude(core: &Arc<Core>) {
    // Children first: wait until every child's executor has let go. Their
    // stop was already dispatched by `stop()`; a child running free simply
    // runs to completion here.
    let children = {
        let mut inner = core.lock();
        let snapshot: Vec<Task> = inner
            .children
            .iter()
            .filter(|c| c.state().is_active())
            .cloned()
            .collect();
        if !snapshot.is_empty() {
            core.set_activity(&mut inner, Activity::Join);
        }
        snapshot
    };
    if !children.is_empty() {
        futures::future::join_all(children.iter().map(|c| c.join())).await;
        let mut inner = core.lock();
        core.set_activity(&mut inner, Activity::None);
    }

    enum Outcome {
        Finished,
        Stopped { silent: bool },
    }

    let outcome = {
        let mut inner = core.lock();
        // Finished children have detached themselves; prune defensively.
        inner.children.retain(|c| c.state() != State::Finished);
        match inner.state {
            State::Started => Outcome::Finished,
            State::ToStop => {
                if inner.chain_done() && inner.children.is_empty() {
                    // The stop arrived after the last link completed.
                    Outcome::Finished
                } else {
                    Outcome::Stopped {
                        silent: !inner.active,
                    }
                }
            }
            state => {
                debug_assert!(false, "conclude in {state:?}");
                return;
            }
        }
    };

    match outcome {
        Outcome::Finished => {
            let (hook, leftovers) = {
                let mut inner = core.lock();
                inner.active = false;
                // A naturally finishing task releases children it could not
                // see to completion (stopped by a third party); they become
                // independent again.
                let leftovers: Vec<Task> = inner.children.drain(..).collect();
                (inner.on_final.clone(), leftovers)
            };
            let me = Task { core: core.clone() };
            for child in leftovers {
                child.core.lock().parent = None;
                core.publish_event(EventKind::ChildDetached)
                    .with_child(child.name())
                    .send();
            }
            if let Some(h) = hook {
                h();
            }
            core.publish_event(EventKind::TaskFinished).send();
            let parent = { core.lock().parent.take() }.and_then(|w| w.upgrade());
            if let Some(parent) = parent {
                remove_child(&parent, &me);
            }
            let mut inner = core.lock();
            inner.anchor = None;
            inner.resume_delay = None;
            inner.delay_called_at = None;
            inner.stopped_at = None;
            inner.rejoin = None;
            inner.attaching = false;
            core.set_state(&mut inner, State::Finished);
        }
        Outcome::Stopped { silent } => {
            let (hook, cursor) = {
                let inner = core.lock();
                (
                    if silent { None } else { inner.on_stop.clone() },
                    inner.cursor,
                )
            };
            if let Some(h) = hook {
                h();
            }
            if !silent {
                core.publish_event(EventKind::TaskStopped)
                    .with_link(cursor)
                    .send();
            }
            let mut inner = core.lock();
            inner.active = false;
            inner.attaching = false;
            core.set_state(&mut inner, State::Stopped);
        }
    }
}

// ---------------------------------------------------------------------------
// Exception climbing
// ---------------------------------------------------------------------------

enum ClimbOutcome {
    /// A handler accepted the failure; the chain proceeds.
    Swallowed,
    /// The failure was recorded and the task told to stop.
    Unwound,
}

/// Routes an action failure to exactly one handler.
///
/// The search order is: the failing link, the chain's head link, then the
/// head link of each ancestor up the tree. If no explicit handler exists the
/// default applies at the topmost visited task: record the failure, stop
/// that task (the stop propagates back down through the tree) and unwind.
fn climb(core: &Arc<Core>, link_idx: usize, error: Arc<ActionError>) -> ClimbOutcome {
    let fault = Fault {
        task: core.name.clone(),
        link: link_idx,
        error: error.clone(),
    };
    let me = Task { core: core.clone() };

    let mut handler = {
        let inner = core.lock();
        inner
            .links
            .get(link_idx)
            .and_then(|l| l.exc_handler.clone())
            .or_else(|| {
                if link_idx != 0 {
                    inner.links.first().and_then(|l| l.exc_handler.clone())
                } else {
                    None
                }
            })
    };

    let mut topmost = me.clone();
    if handler.is_none() {
        loop {
            let parent = { topmost.core.lock().parent.clone() }.and_then(|w| w.upgrade());
            match parent {
                None => break,
                Some(p) => {
                    handler = p.core.lock().links.first().and_then(|l| l.exc_handler.clone());
                    topmost = p;
                    if handler.is_some() {
                        break;
                    }
                }
            }
        }
    }

    match handler {
        Some(handle) => match handle(&fault) {
            Ok(()) => ClimbOutcome::Swallowed,
            Err(reraised) => {
                record_failure(core, link_idx, Arc::new(reraised));
                let _ = me.stop();
                ClimbOutcome::Unwound
            }
        },
        None => {
            record_failure(core, link_idx, error);
            let _ = topmost.stop();
            let _ = me.stop();
            ClimbOutcome::Unwound
        }
    }
}

fn record_failure(core: &Arc<Core>, link_idx: usize, error: Arc<ActionError>) {
    core.publish_event(EventKind::ActionFailed)
        .with_link(link_idx)
        .with_error(error.to_string())
        .send();
    core.lock().error = Some((link_idx, error));
}
