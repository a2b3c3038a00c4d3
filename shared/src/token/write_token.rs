use chanmesh_serde::{BitWriter, Serde};

use crate::{
    channel::writer::WriterConfig,
    context::ChannelContext,
    end_arena::EndHandle,
    error::AccessError,
    identity::channel_name::ChannelName,
    reaction::{ReactionTarget, Reactive},
    store::time_window::TimeWindow,
    types::EntryIndex,
};

/// The value being prepared between `acquire` and `release`.
#[derive(Default)]
pub struct WriteSlot {
    payload: Box<[u8]>,
}

impl WriteSlot {
    /// Encodes `value` as the slot's payload, replacing anything put before.
    pub fn put<T: Serde>(&mut self, value: &T) {
        let mut writer = BitWriter::new();
        value.ser(&mut writer);
        self.payload = writer.to_bytes();
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.payload = bytes.into();
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Owns one write entry on this node's end of a channel.
pub struct WriteToken {
    context: ChannelContext,
    name: ChannelName,
    handle: EndHandle,
    entry: EntryIndex,
    slot: Option<WriteSlot>,
}

impl WriteToken {
    /// Opens a write entry described by `config`. Fails right away only when
    /// the entry clashes with what this node already knows about the channel.
    pub fn open(
        context: &ChannelContext,
        name: impl Into<ChannelName>,
        config: WriterConfig,
    ) -> Result<Self, AccessError> {
        let name = name.into();
        let (handle, entry) = context.coordinator().open_writer(&name, &config)?;
        Ok(Self {
            context: context.clone(),
            name,
            handle,
            entry,
            slot: None,
        })
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn entry(&self) -> EntryIndex {
        self.entry
    }

    pub fn is_valid(&self) -> bool {
        self.context
            .coordinator()
            .write_valid(&self.handle, self.entry)
    }

    /// Hands out the single write slot of this token.
    pub fn acquire(&mut self) -> Result<&mut WriteSlot, AccessError> {
        if self.slot.is_some() {
            return Err(AccessError::AccessNotReleased);
        }
        {
            let coordinator = self.context.coordinator();
            let end = coordinator.live_end(&self.handle)?;
            if !end.has_write_entry(self.entry) {
                return Err(AccessError::MissingChannelEnd);
            }
            if !end.write_entry_valid(self.entry) {
                return Err(AccessError::InvalidToken);
            }
        }
        Ok(self.slot.insert(WriteSlot::default()))
    }

    /// Commits the slot's payload for `window` and queues it for every linked
    /// end.
    pub fn release(&mut self, window: TimeWindow) -> Result<(), AccessError> {
        let slot = self.slot.take().ok_or(AccessError::NotAcquired)?;
        self.context
            .coordinator()
            .live_end_mut(&self.handle)?
            .commit(self.entry, window, slot.payload)?;
        Ok(())
    }

    /// Drops the outstanding slot without committing it.
    pub fn discard(&mut self) -> Result<(), AccessError> {
        self.slot.take().map(|_| ()).ok_or(AccessError::NotAcquired)
    }

    /// Acquires, puts `value` and releases in one step.
    pub fn write<T: Serde>(&mut self, window: TimeWindow, value: &T) -> Result<(), AccessError> {
        self.acquire()?.put(value);
        self.release(window)
    }
}

impl Reactive for WriteToken {
    fn reaction_target(&self) -> ReactionTarget {
        ReactionTarget {
            end: self.handle,
            write_entry: Some(self.entry),
            reader: None,
        }
    }
}

impl Drop for WriteToken {
    fn drop(&mut self) {
        self.context.forget_reactions(&self.reaction_target());
        self.context
            .coordinator()
            .close_writer(self.handle, self.entry);
    }
}
