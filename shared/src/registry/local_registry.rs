use std::collections::HashMap;

use log::debug;

use crate::{
    channel::channel_end::ChannelEnd,
    end_arena::{EndArena, EndHandle},
    error::{FatalError, RegistryError},
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    registry::wait_room::WaitRoom,
    types::NodeIndex,
};

pub struct RegistryEntry {
    pub name: ChannelName,
    /// Unset until node 0 issues the id reserved for this end.
    pub id: Option<ChannelEndId>,
    pub end: ChannelEnd,
}

/// Maps channel names to the channel ends living on this node.
///
/// Every end occupies one arena slot for its whole life, from the moment its
/// id is reserved until `DeleteEnd` frees it. `by_name` only holds ends that
/// tokens may still attach to; an end that is closing keeps its slot but
/// leaves `by_name`, so a new end for the same name can be created while the
/// old one waits for deletion.
pub struct LocalRegistry {
    location: NodeIndex,
    ends: EndArena<RegistryEntry>,
    by_name: HashMap<ChannelName, EndHandle>,
    wait_room: WaitRoom,
}

impl LocalRegistry {
    pub fn new(location: NodeIndex) -> Self {
        Self {
            location,
            ends: EndArena::new(),
            by_name: HashMap::new(),
            wait_room: WaitRoom::new(),
        }
    }

    pub fn location(&self) -> NodeIndex {
        self.location
    }

    /// Creates a new end for `name` under the next free object index.
    pub fn reserve(&mut self, name: &ChannelName) -> Result<EndHandle, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName { name: name.clone() });
        }

        let id = ChannelEndId::new(self.location, self.ends.next_object());
        let handle = self.ends.insert(RegistryEntry {
            name: name.clone(),
            id: None,
            end: ChannelEnd::new(name.clone(), id),
        });
        self.by_name.insert(name.clone(), handle);

        debug!("Reserved end {} for channel {}", id, name);
        Ok(handle)
    }

    /// Puts a closing end back into service under its name.
    pub fn revive(&mut self, handle: &EndHandle) -> Result<(), RegistryError> {
        let entry = self
            .ends
            .get_mut(handle)
            .ok_or(RegistryError::StaleHandle {
                object: handle.object(),
            })?;
        if self.by_name.contains_key(&entry.name) {
            return Err(RegistryError::DuplicateName {
                name: entry.name.clone(),
            });
        }
        entry.end.set_closing(false);
        self.by_name.insert(entry.name.clone(), *handle);
        Ok(())
    }

    pub fn wait_room(&self) -> &WaitRoom {
        &self.wait_room
    }

    pub fn wait_room_mut(&mut self) -> &mut WaitRoom {
        &mut self.wait_room
    }

    /// Records that node 0 issued `id` for the end waiting under `name`.
    pub fn issue(&mut self, name: &ChannelName, id: ChannelEndId) -> Result<EndHandle, FatalError> {
        let handle = self.handle_for_id(&id).ok_or_else(|| {
            FatalError::AcknowledgementMismatch {
                name: name.clone(),
                details: format!("id {} names no local end", id),
            }
        })?;
        let entry = self
            .ends
            .get_mut(&handle)
            .ok_or_else(|| FatalError::AcknowledgementMismatch {
                name: name.clone(),
                details: format!("id {} names a freed end", id),
            })?;
        if entry.name != *name {
            return Err(FatalError::AcknowledgementMismatch {
                name: name.clone(),
                details: format!("id {} belongs to channel {}", id, entry.name),
            });
        }

        entry.id = Some(id);
        self.wait_room.release(name, &handle);
        Ok(handle)
    }

    /// Takes an end out of `by_name` so no further token can attach to it.
    pub fn detach_name(&mut self, handle: &EndHandle) {
        if let Some(entry) = self.ends.get_mut(handle) {
            entry.end.set_closing(true);
            if self.by_name.get(&entry.name) == Some(handle) {
                self.by_name.remove(&entry.name);
            }
        }
    }

    /// Frees the slot of a deleted end.
    pub fn free(&mut self, handle: &EndHandle) -> Option<RegistryEntry> {
        let entry = self.ends.remove(handle)?;
        if self.by_name.get(&entry.name) == Some(handle) {
            self.by_name.remove(&entry.name);
        }
        self.wait_room.release(&entry.name, handle);
        debug!("Freed end {} of channel {}", entry.end.id(), entry.name);
        Some(entry)
    }

    pub fn find(&self, name: &ChannelName) -> Option<EndHandle> {
        self.by_name.get(name).copied()
    }

    pub fn handle_for_id(&self, id: &ChannelEndId) -> Option<EndHandle> {
        if id.location != self.location {
            return None;
        }
        self.ends.handle_of(id.object)
    }

    pub fn get(&self, handle: &EndHandle) -> Option<&RegistryEntry> {
        self.ends.get(handle)
    }

    pub fn get_mut(&mut self, handle: &EndHandle) -> Option<&mut RegistryEntry> {
        self.ends.get_mut(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EndHandle, &RegistryEntry)> {
        self.ends.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EndHandle, &mut RegistryEntry)> {
        self.ends.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}
