//! ## `ChannelEnd` – one node's attachment to a channel
//!
//! A node holds at most one end per channel name. The end owns every entry
//! visible on that node: the write entries its own tokens created and the
//! entries announced by peer ends it is meshed with. Local writes land in
//! the local store immediately and are fanned out as frames to every
//! destination; frames from peers land in the same store.
//!
//! Link state arrives as `LinkUpdate`s. Applying an update twice is a no-op,
//! so the update channel may redeliver without harm.
//!
//! ### Validity
//! * An end is *linked* once its id is issued and it knows the master.
//! * A write entry is *valid* once the end is linked and the entry agrees
//!   with the channel's distribution: the end is the master, or both the
//!   channel and the entry accept several writers over the same transport.

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::{
    channel::{
        frame::{Frame, FrameBody},
        reader::{ReaderConfig, ReaderId, ReaderState},
        writer::{WriterConfig, WriterState},
    },
    control::link_update::LinkUpdate,
    error::{AccessError, FatalError},
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    store::{
        entry::{Entry, EntryKey, StoredValue},
        entry_descriptor::{Arity, EntryDescriptor, TransportClass},
        retention::Retention,
        selector::{ReadMode, Selector},
        time_window::TimeWindow,
    },
    types::{EntryIndex, Tick},
};

/// What an end knows about its channel's master.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasterInfo {
    pub master: ChannelEndId,
    pub transport_class: TransportClass,
    pub arity: Arity,
}

pub struct ChannelEnd {
    name: ChannelName,
    id: ChannelEndId,
    issued: bool,
    master: Option<MasterInfo>,
    destinations: Vec<ChannelEndId>,

    entries: Vec<Entry>,
    writers: HashMap<EntryIndex, WriterState>,
    next_entry_index: EntryIndex,
    readers: HashMap<ReaderId, ReaderState>,
    next_reader_id: ReaderId,

    outgoing: Vec<Frame>,
    latest_data: Option<Tick>,
    closing: bool,
}

impl ChannelEnd {
    /// Creates an end under the id reserved for it locally. The id is not
    /// considered issued until an `IdIssued` update confirms it.
    pub fn new(name: ChannelName, id: ChannelEndId) -> Self {
        Self {
            name,
            id,
            issued: false,
            master: None,
            destinations: Vec::new(),

            entries: Vec::new(),
            writers: HashMap::new(),
            next_entry_index: 0,
            readers: HashMap::new(),
            next_reader_id: 0,

            outgoing: Vec::new(),
            latest_data: None,
            closing: false,
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn id(&self) -> ChannelEndId {
        self.id
    }

    pub fn is_issued(&self) -> bool {
        self.issued
    }

    pub fn master(&self) -> Option<&MasterInfo> {
        self.master.as_ref()
    }

    pub fn is_linked(&self) -> bool {
        self.issued && self.master.is_some()
    }

    pub fn destinations(&self) -> &[ChannelEndId] {
        &self.destinations
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn set_closing(&mut self, closing: bool) {
        self.closing = closing;
    }

    /// Number of tokens currently attached.
    pub fn attachments(&self) -> usize {
        self.readers.len() + self.writers.len()
    }

    // Link updates

    pub fn apply(&mut self, update: &LinkUpdate) -> Result<(), FatalError> {
        match update {
            LinkUpdate::IdIssued { id, .. } => {
                if *id != self.id {
                    return Err(FatalError::AcknowledgementMismatch {
                        name: self.name.clone(),
                        details: format!("issued id {} but end reserved {}", id, self.id),
                    });
                }
                if !self.issued {
                    debug!("End {} of {} issued", self.id, self.name);
                    self.issued = true;
                }
            }
            LinkUpdate::SetMaster {
                master,
                transport_class,
                arity,
                ..
            } => {
                let info = MasterInfo {
                    master: *master,
                    transport_class: *transport_class,
                    arity: *arity,
                };
                match self.master {
                    None => {
                        debug!("End {} of {} learns master {}", self.id, self.name, master);
                        self.master = Some(info);
                    }
                    Some(current) if current.master != info.master => {
                        return Err(FatalError::AcknowledgementMismatch {
                            name: self.name.clone(),
                            details: format!(
                                "master {} announced after master {}",
                                info.master, current.master
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
            LinkUpdate::AddDestination { destination, .. } => {
                self.add_destination(*destination);
            }
            LinkUpdate::DeleteEnd { end } => {
                if *end == self.id {
                    self.closing = true;
                } else {
                    self.forget_peer(end);
                }
            }
        }
        Ok(())
    }

    fn add_destination(&mut self, destination: ChannelEndId) {
        if destination == self.id || self.destinations.contains(&destination) {
            return;
        }
        trace!("End {} of {} adds destination {}", self.id, self.name, destination);
        self.destinations.push(destination);

        // replay own entries so the new peer sees them and their current value
        let own_id = self.id;
        for entry in self.entries.iter().filter(|entry| entry.key().origin == own_id) {
            let index = entry.key().index;
            self.outgoing.push(Frame {
                sender: own_id,
                destination,
                body: FrameBody::Announce {
                    entry: index,
                    descriptor: entry.descriptor().clone(),
                },
            });
            if let Some(latest) = entry.latest() {
                self.outgoing.push(Frame {
                    sender: own_id,
                    destination,
                    body: FrameBody::Value {
                        entry: index,
                        window: latest.window,
                        payload: latest.payload.clone(),
                    },
                });
            }
        }
    }

    /// Drops a deleted peer: its destination link and every entry it wrote.
    /// Returns whether anything changed.
    pub fn forget_peer(&mut self, peer: &ChannelEndId) -> bool {
        let before = self.destinations.len() + self.entries.len();
        self.destinations.retain(|destination| destination != peer);
        self.outgoing.retain(|frame| frame.destination != *peer);

        let removed: Vec<EntryKey> = self
            .entries
            .iter()
            .map(|entry| entry.key())
            .filter(|key| key.origin == *peer)
            .collect();
        for key in &removed {
            self.remove_entry(key);
        }

        before != self.destinations.len() + self.entries.len()
    }

    // Writers

    /// Opens a write entry owned by this end. Fails immediately if the entry
    /// conflicts with what the end already knows about the channel.
    pub fn open_write_entry(&mut self, config: &WriterConfig) -> Result<EntryIndex, AccessError> {
        for entry in &self.entries {
            let descriptor = entry.descriptor();
            if descriptor.label == config.label
                && (descriptor.arity == Arity::OnlyOne || config.arity == Arity::OnlyOne)
            {
                return Err(AccessError::DistributionClash {
                    reason: "an only-one entry with this label already exists",
                });
            }
        }
        if let Some(master) = &self.master {
            if !Self::writer_agrees(master, self.id, config.transport_class, config.arity) {
                return Err(AccessError::DistributionClash {
                    reason: "channel master does not accept this writer",
                });
            }
        }

        let index = self.allocate_entry_index()?;

        let key = EntryKey {
            origin: self.id,
            index,
        };
        let descriptor = config.descriptor();
        for destination in &self.destinations {
            self.outgoing.push(Frame {
                sender: self.id,
                destination: *destination,
                body: FrameBody::Announce {
                    entry: index,
                    descriptor: descriptor.clone(),
                },
            });
        }
        self.entries.push(Entry::new(key, descriptor));
        self.writers.insert(
            index,
            WriterState {
                transport_class: config.transport_class,
                arity: config.arity,
                reported: false,
            },
        );
        Ok(index)
    }

    /// Next index not held by an open write entry, wrapping around.
    fn allocate_entry_index(&mut self) -> Result<EntryIndex, AccessError> {
        for _ in 0..=EntryIndex::MAX {
            let index = self.next_entry_index;
            self.next_entry_index = self.next_entry_index.wrapping_add(1);
            if !self.writers.contains_key(&index) {
                return Ok(index);
            }
        }
        Err(AccessError::EntryIndexExhausted)
    }

    pub fn close_write_entry(&mut self, index: EntryIndex) {
        if self.writers.remove(&index).is_none() {
            return;
        }
        let key = EntryKey {
            origin: self.id,
            index,
        };
        self.remove_entry(&key);
        for destination in &self.destinations {
            self.outgoing.push(Frame {
                sender: self.id,
                destination: *destination,
                body: FrameBody::Retract { entry: index },
            });
        }
    }

    fn writer_agrees(
        master: &MasterInfo,
        own_id: ChannelEndId,
        transport_class: TransportClass,
        arity: Arity,
    ) -> bool {
        if master.master == own_id {
            return true;
        }
        master.transport_class == transport_class
            && master.arity == Arity::OneOrMore
            && arity == Arity::OneOrMore
    }

    pub fn has_write_entry(&self, index: EntryIndex) -> bool {
        self.writers.contains_key(&index)
    }

    pub fn write_entry_valid(&self, index: EntryIndex) -> bool {
        let Some(writer) = self.writers.get(&index) else {
            return false;
        };
        if !self.issued || self.closing {
            return false;
        }
        match &self.master {
            Some(master) => {
                Self::writer_agrees(master, self.id, writer.transport_class, writer.arity)
            }
            None => false,
        }
    }

    /// Write entries that still need an `IsWritingEnd` notification. Marks
    /// them reported.
    pub(crate) fn take_unreported_writers(&mut self) -> Vec<(TransportClass, Arity)> {
        let mut output = Vec::new();
        for writer in self.writers.values_mut() {
            if !writer.reported {
                writer.reported = true;
                output.push((writer.transport_class, writer.arity));
            }
        }
        output
    }

    /// Commits a value to one of this end's write entries and queues it for
    /// every destination.
    pub fn commit(
        &mut self,
        index: EntryIndex,
        window: TimeWindow,
        payload: Box<[u8]>,
    ) -> Result<u64, AccessError> {
        if !self.writers.contains_key(&index) {
            return Err(AccessError::MissingChannelEnd);
        }
        if !self.write_entry_valid(index) {
            return Err(AccessError::InvalidToken);
        }
        let key = EntryKey {
            origin: self.id,
            index,
        };
        let position = self
            .position_of(&key)
            .ok_or(AccessError::MissingChannelEnd)?;
        window.validate(self.entries[position].descriptor().aspect)?;

        for destination in &self.destinations {
            self.outgoing.push(Frame {
                sender: self.id,
                destination: *destination,
                body: FrameBody::Value {
                    entry: index,
                    window,
                    payload: payload.clone(),
                },
            });
        }
        let seq = self.entries[position].push(window, payload);
        self.note_data(window.start);
        self.prune_at(position);
        Ok(seq)
    }

    // Readers

    pub fn attach_reader(&mut self, config: ReaderConfig) -> ReaderId {
        let id = self.next_reader_id;
        self.next_reader_id = self.next_reader_id.wrapping_add(1);
        self.readers.insert(id, ReaderState::new(config));
        id
    }

    pub fn detach_reader(&mut self, reader: ReaderId) {
        if self.readers.remove(&reader).is_some() {
            for position in 0..self.entries.len() {
                self.prune_at(position);
            }
        }
    }

    pub fn has_reader(&self, reader: ReaderId) -> bool {
        self.readers.contains_key(&reader)
    }

    /// Whether the reader probes all of its entries as one stream.
    pub fn reader_joins(&self, reader: ReaderId) -> bool {
        self.readers
            .get(&reader)
            .map(|state| state.config().selector == Selector::VirtualJoin)
            .unwrap_or(false)
    }

    /// Keys of every entry, in attachment order.
    pub fn entry_keys(&self) -> Vec<EntryKey> {
        self.entries.iter().map(|entry| entry.key()).collect()
    }

    pub fn entry(&self, key: &EntryKey) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key() == *key)
    }

    pub fn entry_by_label(&self, label: &str) -> Option<EntryKey> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor().label == label)
            .map(|entry| entry.key())
    }

    pub fn entries_of_class(&self, data_class: &str) -> Vec<EntryKey> {
        self.entries
            .iter()
            .filter(|entry| entry.descriptor().data_class == data_class)
            .map(|entry| entry.key())
            .collect()
    }

    /// Runs the reader's selector over `keys`. A virtual join probes every key
    /// in order; the other selectors read the first key only. A key whose
    /// entry is not (or no longer) held reads as `NoDataAvailable`.
    pub fn read(
        &self,
        reader: ReaderId,
        keys: &[EntryKey],
        t: Tick,
    ) -> Result<(EntryKey, StoredValue), AccessError> {
        let state = self.readers.get(&reader).ok_or(AccessError::InvalidToken)?;
        let config = state.config();

        let probe: &[EntryKey] = match config.selector {
            Selector::VirtualJoin => keys,
            _ => match keys.first() {
                Some(_) => &keys[..1],
                None => return Err(AccessError::NoEntrySelected),
            },
        };

        for key in probe {
            let Some(entry) = self.entry(key) else {
                continue;
            };
            let aspect = entry.descriptor().aspect;
            let found = match config.mode {
                ReadMode::Latest => entry.find(config.selector, t),
                ReadMode::Sequential => entry
                    .next_unread(state.cursor(key))
                    .filter(|value| config.selector.matches(aspect, &value.window, t)),
            };
            if let Some(value) = found {
                return Ok((*key, value.clone()));
            }
        }

        Err(AccessError::NoDataAvailable)
    }

    /// Marks every value of `key` up to and including `seq` as consumed.
    pub fn consume(&mut self, reader: ReaderId, key: EntryKey, seq: u64) -> Result<(), AccessError> {
        let state = self
            .readers
            .get_mut(&reader)
            .ok_or(AccessError::InvalidToken)?;
        state.advance(key, seq + 1);
        if let Some(position) = self.position_of(&key) {
            self.prune_at(position);
        }
        Ok(())
    }

    /// Consumes everything currently retained in `keys`.
    pub fn flush_all(&mut self, reader: ReaderId, keys: &[EntryKey]) -> Result<usize, AccessError> {
        self.flush_with(reader, keys, |entry, _| entry.next_seq())
    }

    /// Consumes every unread value lying entirely before `t`.
    pub fn flush_older_than(
        &mut self,
        reader: ReaderId,
        keys: &[EntryKey],
        t: Tick,
    ) -> Result<usize, AccessError> {
        self.flush_with(reader, keys, |entry, cursor| entry.skip_older_than(cursor, t))
    }

    /// Consumes one value: the next unread value of the first key in `keys`
    /// that has one, probing in the same order as a virtual join.
    pub fn flush_one(&mut self, reader: ReaderId, keys: &[EntryKey]) -> Result<usize, AccessError> {
        let mut done = false;
        self.flush_with(reader, keys, |entry, cursor| {
            if done {
                return cursor;
            }
            match entry.next_unread(cursor) {
                Some(value) => {
                    done = true;
                    value.seq + 1
                }
                None => cursor,
            }
        })
    }

    fn flush_with<F>(
        &mut self,
        reader: ReaderId,
        keys: &[EntryKey],
        mut next_cursor: F,
    ) -> Result<usize, AccessError>
    where
        F: FnMut(&Entry, u64) -> u64,
    {
        let state = self
            .readers
            .get_mut(&reader)
            .ok_or(AccessError::InvalidToken)?;

        let mut flushed = 0;
        let mut touched = Vec::new();
        for key in keys {
            let Some(position) = self.entries.iter().position(|entry| entry.key() == *key) else {
                continue;
            };
            let entry = &self.entries[position];
            let cursor = state.cursor(key);
            let advanced = next_cursor(entry, cursor);
            if advanced > cursor {
                flushed += entry.unread_count(cursor) - entry.unread_count(advanced);
                state.advance(*key, advanced);
                touched.push(position);
            }
        }
        for position in touched {
            self.prune_at(position);
        }
        Ok(flushed)
    }

    /// Reads and consumes every unread value, visiting entries in attachment
    /// order. Used by the coordinator to drain control channels.
    pub(crate) fn drain_sequential(&mut self, reader: ReaderId) -> Vec<(EntryKey, StoredValue)> {
        let Some(state) = self.readers.get_mut(&reader) else {
            return Vec::new();
        };

        let mut output = Vec::new();
        for entry in &self.entries {
            let key = entry.key();
            let cursor = state.cursor(&key);
            let mut last = None;
            for value in entry.values().filter(|value| value.seq >= cursor) {
                last = Some(value.seq);
                output.push((key, value.clone()));
            }
            if let Some(seq) = last {
                state.advance(key, seq + 1);
            }
        }
        for position in 0..self.entries.len() {
            self.prune_at(position);
        }
        output
    }

    // Peer traffic

    /// Stores a frame sent by a peer end.
    pub fn receive(&mut self, frame: Frame) {
        let sender = frame.sender;
        match frame.body {
            FrameBody::Announce { entry, descriptor } => {
                let key = EntryKey {
                    origin: sender,
                    index: entry,
                };
                if self.position_of(&key).is_some() {
                    return;
                }
                trace!("End {} of {} attaches entry {:?}", self.id, self.name, key);
                self.entries.push(Entry::new(key, descriptor));
            }
            FrameBody::Value {
                entry,
                window,
                payload,
            } => {
                let key = EntryKey {
                    origin: sender,
                    index: entry,
                };
                let Some(position) = self.position_of(&key) else {
                    warn!(
                        "End {} of {} received value for unannounced entry {:?}",
                        self.id, self.name, key
                    );
                    return;
                };
                if window
                    .validate(self.entries[position].descriptor().aspect)
                    .is_err()
                {
                    warn!("End {} of {} dropped value with invalid window", self.id, self.name);
                    return;
                }
                self.entries[position].push(window, payload);
                self.note_data(window.start);
                self.prune_at(position);
            }
            FrameBody::Retract { entry } => {
                let key = EntryKey {
                    origin: sender,
                    index: entry,
                };
                self.remove_entry(&key);
            }
        }
    }

    pub fn take_outgoing(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outgoing)
    }

    /// The newest data tick observed since the last call, if any.
    pub fn take_latest_data(&mut self) -> Option<Tick> {
        self.latest_data.take()
    }

    // Introspection

    pub fn buffered_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.len()).sum()
    }

    /// The value with the newest start across all entries.
    pub fn latest_value(&self) -> Option<(EntryKey, &EntryDescriptor, &StoredValue)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.latest().map(|value| (entry, value)))
            .max_by_key(|(_, value)| value.window.start)
            .map(|(entry, value)| (entry.key(), entry.descriptor(), value))
    }

    // Internals

    fn position_of(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == *key)
    }

    fn remove_entry(&mut self, key: &EntryKey) {
        if let Some(position) = self.position_of(key) {
            self.entries.remove(position);
            for state in self.readers.values_mut() {
                state.forget(key);
            }
        }
    }

    fn note_data(&mut self, tick: Tick) {
        self.latest_data = Some(self.latest_data.map_or(tick, |current| current.max(tick)));
    }

    fn prune_at(&mut self, position: usize) {
        let Some(entry) = self.entries.get_mut(position) else {
            return;
        };
        let key = entry.key();

        let mut retention = Retention::new();
        let mut keep_from: Option<u64> = None;
        for state in self.readers.values() {
            retention.absorb(state.config().retention);
            if state.is_sequential() {
                let cursor = state.cursor(&key);
                keep_from = Some(keep_from.map_or(cursor, |current| current.min(cursor)));
            }
        }
        entry.prune(retention, keep_from);
    }
}
