use std::collections::VecDeque;

use crate::{
    identity::channel_end_id::ChannelEndId,
    store::{
        entry_descriptor::EntryDescriptor, retention::Retention, selector::Selector,
        time_window::TimeWindow,
    },
    types::{EntryIndex, Tick},
};

/// Identifies an entry across the whole channel: the end that writes it and
/// the index that end gave it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub origin: ChannelEndId,
    pub index: EntryIndex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredValue {
    /// Arrival order within the entry, used as the sequential read cursor.
    pub seq: u64,
    pub window: TimeWindow,
    pub payload: Box<[u8]>,
}

/// One producer's retained window of timestamped values.
pub struct Entry {
    key: EntryKey,
    descriptor: EntryDescriptor,
    values: VecDeque<StoredValue>,
    next_seq: u64,
}

impl Entry {
    pub fn new(key: EntryKey, descriptor: EntryDescriptor) -> Self {
        Self {
            key,
            descriptor,
            values: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn descriptor(&self) -> &EntryDescriptor {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The sequence number the next pushed value will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn push(&mut self, window: TimeWindow, payload: Box<[u8]>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.values.push_back(StoredValue {
            seq,
            window,
            payload,
        });
        seq
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<&StoredValue> {
        self.values.back()
    }

    pub fn values(&self) -> impl Iterator<Item = &StoredValue> {
        self.values.iter()
    }

    /// Searches the retained window for the value `selector` picks at `t`.
    pub fn find(&self, selector: Selector, t: Tick) -> Option<&StoredValue> {
        let aspect = self.descriptor.aspect;
        match selector {
            Selector::IntervalStart | Selector::VirtualJoin => self
                .values
                .iter()
                .rev()
                .find(|value| selector.matches(aspect, &value.window, t)),
            Selector::IntervalStartOrEarlier => self
                .values
                .iter()
                .filter(|value| selector.matches(aspect, &value.window, t))
                .max_by_key(|value| (value.window.start, value.seq)),
        }
    }

    /// The first value with `seq >= cursor`.
    pub fn next_unread(&self, cursor: u64) -> Option<&StoredValue> {
        self.values.iter().find(|value| value.seq >= cursor)
    }

    pub fn unread_count(&self, cursor: u64) -> usize {
        self.values.iter().filter(|value| value.seq >= cursor).count()
    }

    /// Advances `cursor` past every leading unread value that lies entirely
    /// before `t`.
    pub fn skip_older_than(&self, cursor: u64, t: Tick) -> u64 {
        let aspect = self.descriptor.aspect;
        let start = cursor;
        let mut cursor = cursor;
        for value in self.values.iter().filter(|value| value.seq >= start) {
            if !value.window.is_older_than(aspect, t) {
                break;
            }
            cursor = value.seq + 1;
        }
        cursor
    }

    /// Drops the oldest values that neither the retention nor an unconsumed
    /// sequential cursor (`keep_from`) still needs.
    pub fn prune(&mut self, retention: Retention, keep_from: Option<u64>) {
        let Some(newest) = self.values.iter().map(|value| value.window.end).max() else {
            return;
        };
        let horizon = retention.span.map(|span| newest.saturating_sub(span));
        let slots = retention.slots.max(1);

        while self.values.len() > slots {
            let Some(oldest) = self.values.front() else {
                break;
            };
            if let Some(horizon) = horizon {
                if oldest.window.end >= horizon {
                    break;
                }
            }
            if let Some(keep_from) = keep_from {
                if oldest.seq >= keep_from {
                    break;
                }
            }
            self.values.pop_front();
        }
    }
}
