use chanmesh_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedInteger};

use crate::{
    identity::channel_end_id::ChannelEndId,
    store::{entry_descriptor::EntryDescriptor, time_window::TimeWindow},
    types::EntryIndex,
};

/// One unit of data-plane traffic between two channel ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub sender: ChannelEndId,
    pub destination: ChannelEndId,
    pub body: FrameBody,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameBody {
    /// Declares one of the sender's write entries.
    Announce {
        entry: EntryIndex,
        descriptor: EntryDescriptor,
    },
    /// A committed value of one of the sender's entries.
    Value {
        entry: EntryIndex,
        window: TimeWindow,
        payload: Box<[u8]>,
    },
    /// The sender closed the entry.
    Retract { entry: EntryIndex },
}

impl Frame {
    pub fn to_bytes(&self) -> Box<[u8]> {
        let mut writer = BitWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        let frame = Self::de(&mut reader)?;
        if reader.has_remaining_bytes() {
            return Err(SerdeErr);
        }
        Ok(frame)
    }
}

impl Serde for Frame {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.sender.ser(writer);
        self.destination.ser(writer);
        match &self.body {
            FrameBody::Announce { entry, descriptor } => {
                UnsignedInteger::<2>::new(0_u64).ser(writer);
                entry.ser(writer);
                descriptor.ser(writer);
            }
            FrameBody::Value {
                entry,
                window,
                payload,
            } => {
                UnsignedInteger::<2>::new(1_u64).ser(writer);
                entry.ser(writer);
                window.ser(writer);
                payload.ser(writer);
            }
            FrameBody::Retract { entry } => {
                UnsignedInteger::<2>::new(2_u64).ser(writer);
                entry.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let sender = ChannelEndId::de(reader)?;
        let destination = ChannelEndId::de(reader)?;
        let body = match UnsignedInteger::<2>::de(reader)?.get() {
            0 => FrameBody::Announce {
                entry: EntryIndex::de(reader)?,
                descriptor: EntryDescriptor::de(reader)?,
            },
            1 => FrameBody::Value {
                entry: EntryIndex::de(reader)?,
                window: TimeWindow::de(reader)?,
                payload: Box::<[u8]>::de(reader)?,
            },
            2 => FrameBody::Retract {
                entry: EntryIndex::de(reader)?,
            },
            _ => return Err(SerdeErr),
        };
        Ok(Self {
            sender,
            destination,
            body,
        })
    }
}
