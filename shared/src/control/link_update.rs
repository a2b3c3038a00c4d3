use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    store::entry_descriptor::{Arity, TransportClass},
};

/// A change to one end's identity or links, issued by node 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkUpdate {
    /// The end requested under `name` is confirmed as `id`.
    IdIssued { name: ChannelName, id: ChannelEndId },
    /// `end` learns the channel's master and distribution settings.
    SetMaster {
        end: ChannelEndId,
        master: ChannelEndId,
        transport_class: TransportClass,
        arity: Arity,
    },
    /// `end` must deliver its writes to `destination`.
    AddDestination {
        end: ChannelEndId,
        destination: ChannelEndId,
    },
    /// `end` no longer exists.
    DeleteEnd { end: ChannelEndId },
}

impl LinkUpdate {
    /// The end this update is addressed to.
    pub fn target(&self) -> ChannelEndId {
        match self {
            LinkUpdate::IdIssued { id, .. } => *id,
            LinkUpdate::SetMaster { end, .. }
            | LinkUpdate::AddDestination { end, .. }
            | LinkUpdate::DeleteEnd { end } => *end,
        }
    }
}

impl Serde for LinkUpdate {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            LinkUpdate::IdIssued { name, id } => {
                UnsignedInteger::<2>::new(0_u64).ser(writer);
                name.ser(writer);
                id.ser(writer);
            }
            LinkUpdate::SetMaster {
                end,
                master,
                transport_class,
                arity,
            } => {
                UnsignedInteger::<2>::new(1_u64).ser(writer);
                end.ser(writer);
                master.ser(writer);
                transport_class.ser(writer);
                arity.ser(writer);
            }
            LinkUpdate::AddDestination { end, destination } => {
                UnsignedInteger::<2>::new(2_u64).ser(writer);
                end.ser(writer);
                destination.ser(writer);
            }
            LinkUpdate::DeleteEnd { end } => {
                UnsignedInteger::<2>::new(3_u64).ser(writer);
                end.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(LinkUpdate::IdIssued {
                name: ChannelName::de(reader)?,
                id: ChannelEndId::de(reader)?,
            }),
            1 => Ok(LinkUpdate::SetMaster {
                end: ChannelEndId::de(reader)?,
                master: ChannelEndId::de(reader)?,
                transport_class: TransportClass::de(reader)?,
                arity: Arity::de(reader)?,
            }),
            2 => Ok(LinkUpdate::AddDestination {
                end: ChannelEndId::de(reader)?,
                destination: ChannelEndId::de(reader)?,
            }),
            3 => Ok(LinkUpdate::DeleteEnd {
                end: ChannelEndId::de(reader)?,
            }),
            _ => Err(SerdeErr),
        }
    }
}
