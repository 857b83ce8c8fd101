//! Shared helpers for the integration suites.
//!
//! All timing tests run on tokio's paused clock, so the recorded offsets are
//! exact virtual milliseconds and can be asserted with equality.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use taskchain::{ActionError, ActionFn, ActionRef, Control};

/// Records labelled marks with their offset from construction time.
#[derive(Clone)]
pub struct Recorder {
    origin: Instant,
    entries: Arc<Mutex<Vec<(String, u64)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn mark(&self, label: &str) {
        let at = self.origin.elapsed().as_millis() as u64;
        self.entries
            .lock()
            .expect("recorder mutex")
            .push((label.to_string(), at));
    }

    /// `(label, millisecond)` pairs in recording order.
    pub fn timeline(&self) -> Vec<(String, u64)> {
        self.entries.lock().expect("recorder mutex").clone()
    }

    /// Labels only, in recording order.
    pub fn labels(&self) -> Vec<String> {
        self.timeline().into_iter().map(|(l, _)| l).collect()
    }

    /// Closure suitable for the `on_*` hook setters.
    pub fn hook(&self, label: &str) -> impl Fn() + Send + Sync + 'static {
        let rec = self.clone();
        let label = label.to_string();
        move || rec.mark(&label)
    }
}

pub fn assert_timeline(rec: &Recorder, expected: &[(&str, u64)]) {
    let got = rec.timeline();
    let want: Vec<(String, u64)> = expected
        .iter()
        .map(|(l, t)| (l.to_string(), *t))
        .collect();
    assert_eq!(got, want, "timeline mismatch");
}

/// Action that records `label` and completes immediately.
pub fn note(rec: &Recorder, label: &str) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    ActionFn::unit(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        async move {
            rec.mark(&label);
            Ok(())
        }
    })
}

/// Action that records `label`, then stays busy for `dur` before returning.
pub fn busy_note(rec: &Recorder, label: &str, dur: Duration) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    ActionFn::unit(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        async move {
            rec.mark(&label);
            tokio::time::sleep(dur).await;
            Ok(())
        }
    })
}

/// Repeating action that records `label` and plays back `script`, ending the
/// loop once the script is exhausted.
pub fn control_script(rec: &Recorder, label: &str, script: &[Control]) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    let script = script.to_vec();
    let idx = Arc::new(AtomicUsize::new(0));
    ActionFn::arc(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        let script = script.clone();
        let idx = idx.clone();
        async move {
            let i = idx.fetch_add(1, Ordering::SeqCst);
            rec.mark(&label);
            Ok(script.get(i).copied().unwrap_or(Control::Done))
        }
    })
}

/// Action that always fails with the given reason.
pub fn always_fails(reason: &str) -> ActionRef {
    let reason = reason.to_string();
    ActionFn::arc(move |_ctx| {
        let reason = reason.clone();
        async move { Err(ActionError::fail(reason)) }
    })
}

/// Action that fails on the first invocation and succeeds afterwards.
pub fn fails_once(rec: &Recorder, label: &str) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    let calls = Arc::new(AtomicUsize::new(0));
    ActionFn::arc(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ActionError::fail("first call fails"))
            } else {
                rec.mark(&label);
                Ok(Control::Done)
            }
        }
    })
}

/// Shared boolean, set by one task and polled by another.
#[derive(Clone, Default)]
pub struct Flag(Arc<AtomicBool>);

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Action that sets the flag and records `label`.
pub fn setter(rec: &Recorder, label: &str, flag: &Flag) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    let flag = flag.clone();
    ActionFn::unit(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        let flag = flag.clone();
        async move {
            rec.mark(&label);
            flag.set();
            Ok(())
        }
    })
}

/// Periodic-style action that records `label` and ends the loop once the
/// flag is set.
pub fn poller(rec: &Recorder, label: &str, flag: &Flag) -> ActionRef {
    let rec = rec.clone();
    let label = label.to_string();
    let flag = flag.clone();
    ActionFn::arc(move |_ctx| {
        let rec = rec.clone();
        let label = label.clone();
        let flag = flag.clone();
        async move {
            rec.mark(&label);
            Ok(Control::from(flag.get()))
        }
    })
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
