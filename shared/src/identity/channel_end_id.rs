use std::fmt;

use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::types::{NodeIndex, ObjectIndex};

/// Globally unique identity of a channel end: the node that hosts it and a
/// node-local object index. The object index is stable while the end lives
/// and may be handed to a different end after deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelEndId {
    pub location: NodeIndex,
    pub object: ObjectIndex,
}

impl ChannelEndId {
    pub const fn new(location: NodeIndex, object: ObjectIndex) -> Self {
        Self { location, object }
    }
}

impl fmt::Display for ChannelEndId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.location, self.object)
    }
}

impl Serde for ChannelEndId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.location.ser(writer);
        UnsignedVariableInteger::<7>::new(self.object).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let location = NodeIndex::de(reader)?;
        let object = UnsignedVariableInteger::<7>::de(reader)?.get();
        let object = ObjectIndex::try_from(object).map_err(|_| SerdeErr)?;
        Ok(Self { location, object })
    }
}
