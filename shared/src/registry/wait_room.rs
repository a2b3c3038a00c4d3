use std::collections::HashMap;

use log::trace;

use crate::{end_arena::EndHandle, identity::channel_name::ChannelName};

/// Ends whose id has been requested from node 0 but not yet issued.
pub struct WaitRoom {
    waiting: HashMap<ChannelName, EndHandle>,
}

impl WaitRoom {
    pub fn new() -> Self {
        Self {
            waiting: HashMap::new(),
        }
    }

    /// Stages `handle` under `name`, returning whichever end was waiting there
    /// before.
    pub fn stage(&mut self, name: ChannelName, handle: EndHandle) -> Option<EndHandle> {
        trace!("Channel {} waits for id (object {})", name, handle.object());
        self.waiting.insert(name, handle)
    }

    pub fn get(&self, name: &ChannelName) -> Option<EndHandle> {
        self.waiting.get(name).copied()
    }

    /// Removes `name` only if it is still waiting under `handle`.
    pub fn release(&mut self, name: &ChannelName, handle: &EndHandle) -> bool {
        if self.waiting.get(name) == Some(handle) {
            self.waiting.remove(name);
            return true;
        }
        false
    }

    pub fn contains(&self, name: &ChannelName) -> bool {
        self.waiting.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

impl Default for WaitRoom {
    fn default() -> Self {
        Self::new()
    }
}
