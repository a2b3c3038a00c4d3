use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

/// How an entry represents time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeAspect {
    /// Each value is valid over a half-open interval `[start, end)`.
    Stream,
    /// Each value happens at a single tick.
    Event,
}

/// How many write entries a channel tolerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    OnlyOne,
    OneOrMore,
}

/// How value payloads are encoded, used by introspection to render values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackingMode {
    Binary,
    Text,
}

/// Which transport a channel's master expects its data to travel over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportClass {
    Reflective,
    Socket,
}

macro_rules! impl_serde_for_tag {
    ($impl_type:ident, $($variant:ident = $tag:literal),+) => {
        impl Serde for $impl_type {
            fn ser(&self, writer: &mut dyn BitWrite) {
                let tag: u64 = match self {
                    $($impl_type::$variant => $tag,)+
                };
                UnsignedInteger::<2>::new(tag).ser(writer);
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                match UnsignedInteger::<2>::de(reader)?.get() {
                    $($tag => Ok($impl_type::$variant),)+
                    _ => Err(SerdeErr),
                }
            }
        }
    };
}

impl_serde_for_tag!(TimeAspect, Stream = 0, Event = 1);
impl_serde_for_tag!(Arity, OnlyOne = 0, OneOrMore = 1);
impl_serde_for_tag!(PackingMode, Binary = 0, Text = 1);
impl_serde_for_tag!(TransportClass, Reflective = 0, Socket = 1);

/// The static description of an entry, announced to every peer end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub label: String,
    pub data_class: String,
    pub aspect: TimeAspect,
    pub arity: Arity,
    pub packing: PackingMode,
}

impl Serde for EntryDescriptor {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.label.ser(writer);
        self.data_class.ser(writer);
        self.aspect.ser(writer);
        self.arity.ser(writer);
        self.packing.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            label: String::de(reader)?,
            data_class: String::de(reader)?,
            aspect: TimeAspect::de(reader)?,
            arity: Arity::de(reader)?,
            packing: PackingMode::de(reader)?,
        })
    }
}
