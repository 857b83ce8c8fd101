//! # Return protocol for repeating actions.
//!
//! An action tells the executor what to do next by returning a [`Control`]:
//!
//! | Variant              | Once link        | Repeated link                  | Periodic link                      |
//! |----------------------|------------------|--------------------------------|------------------------------------|
//! | [`Control::Done`]    | ignored          | end the loop                   | end the loop                       |
//! | [`Control::Again`]   | ignored          | re-invoke immediately          | re-invoke after the interval       |
//! | [`Control::After`]   | ignored          | re-invoke after the given gap  | re-invoke after the interval       |
//!
//! The adaptation happens at the call site in the executor: a once link runs
//! its action exactly once whatever it returns, a periodic link overrides any
//! returned gap with its fixed interval. The `num` cap of a repeating link is
//! an equivalent terminator: whichever of `Done` / cap-reached fires first
//! ends the loop.

use std::time::Duration;

/// What a repeating action wants the executor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// End the loop; the link is complete.
    Done,
    /// Invoke the action again immediately.
    Again,
    /// Invoke the action again after the given gap.
    ///
    /// By default the gap is measured from the moment the action *started*
    /// (the time the action itself consumed counts toward the gap); with
    /// `netto_time` it is measured from the moment the action returned.
    After(Duration),
}

impl Control {
    /// True if this value terminates the loop.
    pub fn is_done(&self) -> bool {
        matches!(self, Control::Done)
    }
}

impl From<()> for Control {
    /// Unit-returning actions behave like single-shot work.
    fn from(_: ()) -> Self {
        Control::Done
    }
}

impl From<bool> for Control {
    /// Boolean protocol of periodic actions: `true` ends the loop.
    fn from(done: bool) -> Self {
        if done {
            Control::Done
        } else {
            Control::Again
        }
    }
}

impl From<Duration> for Control {
    fn from(gap: Duration) -> Self {
        Control::After(gap)
    }
}
