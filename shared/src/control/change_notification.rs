use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    store::entry_descriptor::{Arity, TransportClass},
};

/// A request from some node to the organiser of `name` on node 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeNotification {
    /// A new end wants to join the channel under the id it reserved locally.
    NewEnd {
        name: ChannelName,
        requester_id: ChannelEndId,
    },
    /// The end has opened a write entry.
    IsWritingEnd {
        name: ChannelName,
        end_id: ChannelEndId,
        transport_class: TransportClass,
        arity: Arity,
    },
    /// The end is gone.
    RemoveEnd {
        name: ChannelName,
        end_id: ChannelEndId,
    },
}

impl ChangeNotification {
    pub fn name(&self) -> &ChannelName {
        match self {
            ChangeNotification::NewEnd { name, .. }
            | ChangeNotification::IsWritingEnd { name, .. }
            | ChangeNotification::RemoveEnd { name, .. } => name,
        }
    }
}

impl Serde for ChangeNotification {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            ChangeNotification::NewEnd { name, requester_id } => {
                UnsignedInteger::<2>::new(0_u64).ser(writer);
                name.ser(writer);
                requester_id.ser(writer);
            }
            ChangeNotification::IsWritingEnd {
                name,
                end_id,
                transport_class,
                arity,
            } => {
                UnsignedInteger::<2>::new(1_u64).ser(writer);
                name.ser(writer);
                end_id.ser(writer);
                transport_class.ser(writer);
                arity.ser(writer);
            }
            ChangeNotification::RemoveEnd { name, end_id } => {
                UnsignedInteger::<2>::new(2_u64).ser(writer);
                name.ser(writer);
                end_id.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(ChangeNotification::NewEnd {
                name: ChannelName::de(reader)?,
                requester_id: ChannelEndId::de(reader)?,
            }),
            1 => Ok(ChangeNotification::IsWritingEnd {
                name: ChannelName::de(reader)?,
                end_id: ChannelEndId::de(reader)?,
                transport_class: TransportClass::de(reader)?,
                arity: Arity::de(reader)?,
            }),
            2 => Ok(ChangeNotification::RemoveEnd {
                name: ChannelName::de(reader)?,
                end_id: ChannelEndId::de(reader)?,
            }),
            _ => Err(SerdeErr),
        }
    }
}
