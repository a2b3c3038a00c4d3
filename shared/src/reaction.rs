use std::collections::HashMap;

use log::trace;

use crate::{
    channel::reader::ReaderId,
    end_arena::EndHandle,
    types::{EntryIndex, Tick},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReactionKey(u32);

/// What a reaction watches: a channel end, and the write entry or reader of
/// the token that registered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReactionTarget {
    pub end: EndHandle,
    pub write_entry: Option<EntryIndex>,
    pub reader: Option<ReaderId>,
}

/// Anything a reaction can be attached to.
pub trait Reactive {
    fn reaction_target(&self) -> ReactionTarget;
}

pub(crate) enum Callback {
    Valid(Box<dyn FnMut() + Send>),
    Data(Box<dyn FnMut(Tick) + Send>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Trigger {
    Valid,
    Data(Tick),
}

struct Reaction {
    target: ReactionTarget,
    /// Data from this tick on fires the reaction. `None` while switched off.
    armed_since: Option<Tick>,
    fired: bool,
    /// Taken out while the callback runs.
    callback: Option<Callback>,
}

pub(crate) struct Reactions {
    next_key: u32,
    reactions: HashMap<ReactionKey, Reaction>,
}

impl Reactions {
    pub(crate) fn new() -> Self {
        Self {
            next_key: 0,
            reactions: HashMap::new(),
        }
    }

    /// Registers a reaction, armed from tick 0.
    pub(crate) fn insert(&mut self, target: ReactionTarget, callback: Callback) -> ReactionKey {
        let key = ReactionKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        self.reactions.insert(
            key,
            Reaction {
                target,
                armed_since: Some(0),
                fired: false,
                callback: Some(callback),
            },
        );
        key
    }

    pub(crate) fn switch_on(&mut self, key: &ReactionKey, time: Tick) -> bool {
        let Some(reaction) = self.reactions.get_mut(key) else {
            return false;
        };
        trace!("Reaction {:?} switched on at {}", key, time);
        reaction.armed_since = Some(time);
        reaction.fired = false;
        true
    }

    pub(crate) fn switch_off(&mut self, key: &ReactionKey, time: Tick) -> bool {
        let Some(reaction) = self.reactions.get_mut(key) else {
            return false;
        };
        trace!("Reaction {:?} switched off at {}", key, time);
        reaction.armed_since = None;
        true
    }

    pub(crate) fn remove(&mut self, key: &ReactionKey) -> bool {
        self.reactions.remove(key).is_some()
    }

    /// Drops every reaction registered for `target`. Returns how many went.
    pub(crate) fn remove_target(&mut self, target: &ReactionTarget) -> usize {
        let before = self.reactions.len();
        self.reactions.retain(|_, reaction| reaction.target != *target);
        before - self.reactions.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Reactions that should fire now. Validity reactions are marked fired
    /// so they run once per arming.
    pub(crate) fn collect_due<F>(
        &mut self,
        data_events: &HashMap<EndHandle, Tick>,
        is_valid: F,
    ) -> Vec<(ReactionKey, Trigger)>
    where
        F: Fn(&ReactionTarget) -> bool,
    {
        let mut due = Vec::new();
        for (key, reaction) in self.reactions.iter_mut() {
            let Some(since) = reaction.armed_since else {
                continue;
            };
            match reaction.callback {
                Some(Callback::Valid(_)) => {
                    if !reaction.fired && is_valid(&reaction.target) {
                        reaction.fired = true;
                        due.push((*key, Trigger::Valid));
                    }
                }
                Some(Callback::Data(_)) => {
                    if let Some(tick) = data_events.get(&reaction.target.end) {
                        if *tick >= since {
                            due.push((*key, Trigger::Data(*tick)));
                        }
                    }
                }
                None => {}
            }
        }
        due.sort_by_key(|(key, _)| key.0);
        due
    }

    pub(crate) fn take_callback(&mut self, key: &ReactionKey) -> Option<Callback> {
        self.reactions.get_mut(key)?.callback.take()
    }

    /// Puts a callback back after it ran, unless the reaction was removed in
    /// the meantime.
    pub(crate) fn restore(&mut self, key: &ReactionKey, callback: Callback) {
        if let Some(reaction) = self.reactions.get_mut(key) {
            reaction.callback = Some(callback);
        }
    }
}
