use std::fmt;

use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// Identifies a channel independently of the node an end lives on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName {
    pub class: String,
    pub entity: String,
    pub instance: String,
}

impl ChannelName {
    pub fn new(
        class: impl Into<String>,
        entity: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            entity: entity.into(),
            instance: instance.into(),
        }
    }

    /// Channel carrying `ChangeNotification`s towards node 0.
    pub fn request() -> Self {
        Self::new("chanmesh", "registry", "request")
    }

    /// Channel carrying `LinkUpdate`s from node 0 to every node.
    pub fn update() -> Self {
        Self::new("chanmesh", "registry", "update")
    }

    pub fn is_control(&self) -> bool {
        *self == Self::request() || *self == Self::update()
    }
}

impl From<&str> for ChannelName {
    /// A bare name maps onto the `user` class with an empty instance.
    fn from(entity: &str) -> Self {
        Self::new("user", entity, "")
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.class, self.entity, self.instance)
    }
}

impl Serde for ChannelName {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.class.ser(writer);
        self.entity.ser(writer);
        self.instance.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            class: String::de(reader)?,
            entity: String::de(reader)?,
            instance: String::de(reader)?,
        })
    }
}
