use crate::{
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    store::entry_descriptor::{Arity, TransportClass},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndSpec {
    pub id: ChannelEndId,
}

/// Authoritative state of one channel, held on node 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganiserRecord {
    pub name: ChannelName,
    /// The first writer. Never reassigned while the record exists.
    pub master: Option<ChannelEndId>,
    pub transport_class: TransportClass,
    pub arity: Arity,
    /// Ends in arrival order.
    pub ends: Vec<EndSpec>,
}

impl OrganiserRecord {
    pub fn new(name: ChannelName) -> Self {
        Self {
            name,
            master: None,
            transport_class: TransportClass::Socket,
            arity: Arity::OneOrMore,
            ends: Vec::new(),
        }
    }

    pub fn position_of(&self, id: &ChannelEndId) -> Option<usize> {
        self.ends.iter().position(|spec| spec.id == *id)
    }

    pub fn contains(&self, id: &ChannelEndId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}
