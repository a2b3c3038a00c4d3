use crate::{
    store::{entry_descriptor::TimeAspect, time_window::TimeWindow},
    types::Tick,
};

/// The matching rule a read end applies to a request time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Stream: `start <= t < end`. Event: `start == t`.
    IntervalStart,
    /// `start <= t`, even if the window no longer contains `t`.
    IntervalStartOrEarlier,
    /// Interval-start match probed across every entry in attachment order.
    VirtualJoin,
}

/// Whether reads search the retained window or walk it one value at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Search by request time; old values may be discarded unread.
    Latest,
    /// Test the next unread value only; nothing is discarded until consumed.
    Sequential,
}

impl Selector {
    pub fn matches(&self, aspect: TimeAspect, window: &TimeWindow, t: Tick) -> bool {
        match self {
            Selector::IntervalStart | Selector::VirtualJoin => match aspect {
                TimeAspect::Stream => window.contains(t),
                TimeAspect::Event => window.start == t,
            },
            Selector::IntervalStartOrEarlier => window.start <= t,
        }
    }
}
