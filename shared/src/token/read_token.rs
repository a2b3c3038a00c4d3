use chanmesh_serde::{BitReader, Serde, SerdeErr};

use crate::{
    channel::{channel_end::ChannelEnd, reader::ReaderConfig, reader::ReaderId},
    context::ChannelContext,
    end_arena::EndHandle,
    error::AccessError,
    identity::channel_name::ChannelName,
    reaction::{ReactionTarget, Reactive},
    store::{entry::EntryKey, time_window::TimeWindow},
    types::Tick,
};

/// Which entries of the channel a read token looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Every entry, in attachment order.
    All,
    /// One entry by key, for the token's lifetime.
    ById(EntryKey),
    /// One entry by label, for the token's lifetime.
    ByLabel(String),
    /// Iteration over the entries of one data class.
    Class {
        data_class: String,
        current: Option<EntryKey>,
    },
}

/// A value handed out by `ReadToken::acquire`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadAccess {
    pub entry: EntryKey,
    pub window: TimeWindow,
    pub payload: Box<[u8]>,
}

impl ReadAccess {
    /// Decodes the payload as `T`, rejecting trailing bytes.
    pub fn value<T: Serde>(&self) -> Result<T, AccessError> {
        let mut reader = BitReader::new(&self.payload);
        let value = T::de(&mut reader)?;
        if reader.has_remaining_bytes() {
            return Err(AccessError::Decode(SerdeErr));
        }
        Ok(value)
    }
}

/// Reads one node's view of a channel.
pub struct ReadToken {
    context: ChannelContext,
    name: ChannelName,
    handle: EndHandle,
    reader: ReaderId,
    selection: Selection,
    outstanding: Option<(EntryKey, u64)>,
}

impl ReadToken {
    pub fn open(
        context: &ChannelContext,
        name: impl Into<ChannelName>,
        config: ReaderConfig,
    ) -> Result<Self, AccessError> {
        Self::open_with(context, name, config, Selection::All)
    }

    pub fn open_with(
        context: &ChannelContext,
        name: impl Into<ChannelName>,
        config: ReaderConfig,
        selection: Selection,
    ) -> Result<Self, AccessError> {
        let name = name.into();
        let (handle, reader) = context.coordinator().open_reader(&name, config)?;
        Ok(Self {
            context: context.clone(),
            name,
            handle,
            reader,
            selection,
            outstanding: None,
        })
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_valid(&self) -> bool {
        self.context.coordinator().read_valid(&self.handle)
    }

    // Class iteration

    /// Selects the first entry of `data_class`. Returns whether one exists.
    pub fn select_first(&mut self, data_class: &str) -> bool {
        let first = self
            .context
            .coordinator()
            .live_end(&self.handle)
            .ok()
            .and_then(|end| end.entries_of_class(data_class).first().copied());
        self.selection = Selection::Class {
            data_class: data_class.to_string(),
            current: first,
        };
        first.is_some()
    }

    /// Moves to the entry after the current one in the selected class.
    pub fn select_next(&mut self) -> bool {
        let Selection::Class {
            data_class,
            current,
        } = &mut self.selection
        else {
            return false;
        };
        let Some(previous) = *current else {
            return false;
        };

        let coordinator = self.context.coordinator();
        let Ok(end) = coordinator.live_end(&self.handle) else {
            *current = None;
            return false;
        };
        let keys = end.entries_of_class(data_class);
        *current = keys
            .iter()
            .position(|key| *key == previous)
            .and_then(|position| keys.get(position + 1))
            .copied();
        current.is_some()
    }

    /// Whether the class iteration currently points at a live entry.
    pub fn have_entry(&self) -> bool {
        let Selection::Class {
            current: Some(key), ..
        } = &self.selection
        else {
            return false;
        };
        self.context
            .coordinator()
            .live_end(&self.handle)
            .map(|end| end.entry(key).is_some())
            .unwrap_or(false)
    }

    fn selected_keys(&self, end: &ChannelEnd) -> Result<Vec<EntryKey>, AccessError> {
        match &self.selection {
            Selection::All => Ok(end.entry_keys()),
            Selection::ById(key) => Ok(vec![*key]),
            Selection::ByLabel(label) => end
                .entry_by_label(label)
                .map(|key| vec![key])
                .ok_or(AccessError::NoDataAvailable),
            Selection::Class {
                data_class,
                current,
            } => {
                if end.reader_joins(self.reader) {
                    return Ok(end.entries_of_class(data_class));
                }
                current
                    .map(|key| vec![key])
                    .ok_or(AccessError::NoEntrySelected)
            }
        }
    }

    // Access

    /// Runs the token's selector for request time `t`.
    pub fn acquire(&mut self, t: Tick) -> Result<ReadAccess, AccessError> {
        if self.outstanding.is_some() {
            return Err(AccessError::AccessNotReleased);
        }

        let coordinator = self.context.coordinator();
        let end = coordinator.live_end(&self.handle)?;
        if !end.is_linked() {
            return Err(AccessError::InvalidToken);
        }
        let keys = self.selected_keys(end)?;
        let (entry, value) = end.read(self.reader, &keys, t)?;
        drop(coordinator);

        self.outstanding = Some((entry, value.seq));
        Ok(ReadAccess {
            entry,
            window: value.window,
            payload: value.payload,
        })
    }

    /// Returns the slot without consuming the value.
    pub fn release(&mut self) -> Result<(), AccessError> {
        self.outstanding
            .take()
            .map(|_| ())
            .ok_or(AccessError::NotAcquired)
    }

    /// Returns the slot and advances the sequential cursor past the value.
    pub fn release_consuming(&mut self) -> Result<(), AccessError> {
        let (entry, seq) = self.outstanding.take().ok_or(AccessError::NotAcquired)?;
        self.context
            .coordinator()
            .live_end_mut(&self.handle)?
            .consume(self.reader, entry, seq)
    }

    pub fn flush_all(&mut self) -> Result<usize, AccessError> {
        self.flush(|end, reader, keys| end.flush_all(reader, keys))
    }

    pub fn flush_older_than(&mut self, t: Tick) -> Result<usize, AccessError> {
        self.flush(|end, reader, keys| end.flush_older_than(reader, keys, t))
    }

    pub fn flush_one(&mut self) -> Result<usize, AccessError> {
        self.flush(|end, reader, keys| end.flush_one(reader, keys))
    }

    fn flush<F>(&mut self, flush: F) -> Result<usize, AccessError>
    where
        F: FnOnce(&mut ChannelEnd, ReaderId, &[EntryKey]) -> Result<usize, AccessError>,
    {
        if self.outstanding.is_some() {
            return Err(AccessError::AccessNotReleased);
        }
        let mut coordinator = self.context.coordinator();
        let end = coordinator.live_end_mut(&self.handle)?;
        let keys = self.selected_keys(end)?;
        flush(end, self.reader, &keys)
    }
}

impl Reactive for ReadToken {
    fn reaction_target(&self) -> ReactionTarget {
        ReactionTarget {
            end: self.handle,
            write_entry: None,
            reader: Some(self.reader),
        }
    }
}

impl Drop for ReadToken {
    fn drop(&mut self) {
        self.context.forget_reactions(&self.reaction_target());
        self.context
            .coordinator()
            .close_reader(self.handle, self.reader);
    }
}
