use chanmesh_shared::{
    BitReader, BitWrite, ChannelEndId, ChannelName, EntryIndex, EntryKey, PackingMode, Serde,
    SerdeErr, TimeWindow, UnsignedInteger,
};

pub fn count_request_channel() -> ChannelName {
    ChannelName::new("diag", "count", "request")
}

pub fn count_result_channel() -> ChannelName {
    ChannelName::new("diag", "count", "result")
}

pub fn monitor_request_channel() -> ChannelName {
    ChannelName::new("diag", "monitor", "request")
}

pub fn monitor_result_channel() -> ChannelName {
    ChannelName::new("diag", "monitor", "result")
}

/// Asks the node hosting `id` how many values its end buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountRequest {
    pub id: ChannelEndId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountResult {
    pub id: ChannelEndId,
    pub buffered: u64,
}

/// Asks the node hosting `id` for the newest value its end holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorRequest {
    pub id: ChannelEndId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorResult {
    pub id: ChannelEndId,
    /// `None` when the end holds no value.
    pub sample: Option<MonitorSample>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorSample {
    pub entry: EntryKey,
    pub label: String,
    pub window: TimeWindow,
    pub rendering: Rendering,
}

/// Class-agnostic view of a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendering {
    Text(String),
    Hex(String),
}

impl Rendering {
    pub fn of(packing: PackingMode, payload: &[u8]) -> Self {
        match packing {
            PackingMode::Text => Rendering::Text(String::from_utf8_lossy(payload).into_owned()),
            PackingMode::Binary => Rendering::Hex(
                payload
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }
}

// Serde

impl Serde for CountRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ChannelEndId::de(reader)?,
        })
    }
}

impl Serde for CountResult {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.buffered.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ChannelEndId::de(reader)?,
            buffered: u64::de(reader)?,
        })
    }
}

impl Serde for MonitorRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ChannelEndId::de(reader)?,
        })
    }
}

impl Serde for MonitorResult {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.sample.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            id: ChannelEndId::de(reader)?,
            sample: Option::<MonitorSample>::de(reader)?,
        })
    }
}

impl Serde for MonitorSample {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.entry.origin.ser(writer);
        self.entry.index.ser(writer);
        self.label.ser(writer);
        self.window.ser(writer);
        self.rendering.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let origin = ChannelEndId::de(reader)?;
        let index = EntryIndex::de(reader)?;
        Ok(Self {
            entry: EntryKey { origin, index },
            label: String::de(reader)?,
            window: TimeWindow::de(reader)?,
            rendering: Rendering::de(reader)?,
        })
    }
}

impl Serde for Rendering {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Rendering::Text(text) => {
                UnsignedInteger::<1>::new(0_u64).ser(writer);
                text.ser(writer);
            }
            Rendering::Hex(hex) => {
                UnsignedInteger::<1>::new(1_u64).ser(writer);
                hex.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<1>::de(reader)?.get() {
            0 => Ok(Rendering::Text(String::de(reader)?)),
            1 => Ok(Rendering::Hex(String::de(reader)?)),
            _ => Err(SerdeErr),
        }
    }
}
