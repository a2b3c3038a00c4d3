use std::{collections::HashMap, sync::Arc};

use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::{
    coordinator::{CoordinatorConfig, RegistryCoordinator},
    error::FatalError,
    identity::channel_name::ChannelName,
    reaction::{Callback, ReactionKey, ReactionTarget, Reactions, Reactive, Trigger},
    types::{NodeIndex, Tick},
};

struct ContextInner {
    coordinator: Mutex<RegistryCoordinator>,
    reactions: Mutex<Reactions>,
}

/// Handle to one node's channel core, cloned into every token.
///
/// Tokens lock the coordinator for the duration of a single call. Reactions
/// always run with no lock held, so a callback may open tokens or register
/// further reactions. Dropping a token while holding the guard returned by
/// `coordinator()` deadlocks.
#[derive(Clone)]
pub struct ChannelContext {
    inner: Arc<ContextInner>,
}

impl ChannelContext {
    pub fn new(config: CoordinatorConfig) -> Result<Self, FatalError> {
        let coordinator = RegistryCoordinator::new(config)?;
        Ok(Self {
            inner: Arc::new(ContextInner {
                coordinator: Mutex::new(coordinator),
                reactions: Mutex::new(Reactions::new()),
            }),
        })
    }

    pub fn coordinator(&self) -> MutexGuard<'_, RegistryCoordinator> {
        self.inner.coordinator.lock()
    }

    pub fn location(&self) -> NodeIndex {
        self.coordinator().location()
    }

    /// Closes this node's end of `name`. Open tokens observe
    /// `MissingChannelEnd`.
    pub fn remove_end(&self, name: &ChannelName) -> bool {
        self.coordinator().remove_end(name)
    }

    /// Calls `callback` once `token` becomes valid.
    pub fn on_valid<T, F>(&self, token: &T, callback: F) -> ReactionKey
    where
        T: Reactive,
        F: FnMut() + Send + 'static,
    {
        self.inner
            .reactions
            .lock()
            .insert(token.reaction_target(), Callback::Valid(Box::new(callback)))
    }

    /// Calls `callback` with the newest tick whenever the end behind `token`
    /// stores new data.
    pub fn on_data<T, F>(&self, token: &T, callback: F) -> ReactionKey
    where
        T: Reactive,
        F: FnMut(Tick) + Send + 'static,
    {
        self.inner
            .reactions
            .lock()
            .insert(token.reaction_target(), Callback::Data(Box::new(callback)))
    }

    pub fn switch_on(&self, key: &ReactionKey, time: Tick) -> bool {
        self.inner.reactions.lock().switch_on(key, time)
    }

    pub fn switch_off(&self, key: &ReactionKey, time: Tick) -> bool {
        self.inner.reactions.lock().switch_off(key, time)
    }

    pub fn remove_reaction(&self, key: &ReactionKey) -> bool {
        self.inner.reactions.lock().remove(key)
    }

    /// Drops the reactions of a token that is going away.
    pub(crate) fn forget_reactions(&self, target: &ReactionTarget) {
        let removed = self.inner.reactions.lock().remove_target(target);
        if removed > 0 {
            trace!("Dropped {} reactions of a closed token", removed);
        }
    }

    pub fn reaction_count(&self) -> usize {
        self.inner.reactions.lock().len()
    }

    /// Fires every reaction that became due since the last call. Returns how
    /// many ran. Nothing fires once the node is in safety stop.
    pub fn dispatch_reactions(&self) -> usize {
        let data_events: HashMap<_, _> = {
            let mut coordinator = self.inner.coordinator.lock();
            let events = coordinator.take_data_events();
            if coordinator.fatal().is_some() {
                return 0;
            }
            events.into_iter().collect()
        };

        let due = {
            let mut reactions = self.inner.reactions.lock();
            let coordinator = self.inner.coordinator.lock();
            reactions.collect_due(&data_events, |target| match target.write_entry {
                Some(index) => coordinator.write_valid(&target.end, index),
                None => coordinator.read_valid(&target.end),
            })
        };

        let mut fired = 0;
        for (key, trigger) in due {
            let Some(mut callback) = self.inner.reactions.lock().take_callback(&key) else {
                continue;
            };
            match (&mut callback, trigger) {
                (Callback::Valid(valid), Trigger::Valid) => valid(),
                (Callback::Data(data), Trigger::Data(tick)) => data(tick),
                _ => {}
            }
            self.inner.reactions.lock().restore(&key, callback);
            fired += 1;
        }
        fired
    }
}
