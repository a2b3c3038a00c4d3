use crate::store::entry_descriptor::{
    Arity, EntryDescriptor, PackingMode, TimeAspect, TransportClass,
};

/// Everything a write token declares about the entry it creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriterConfig {
    pub label: String,
    pub data_class: String,
    pub aspect: TimeAspect,
    pub arity: Arity,
    pub packing: PackingMode,
    pub transport_class: TransportClass,
}

impl WriterConfig {
    pub fn new(label: impl Into<String>, data_class: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data_class: data_class.into(),
            aspect: TimeAspect::Stream,
            arity: Arity::OneOrMore,
            packing: PackingMode::Binary,
            transport_class: TransportClass::Socket,
        }
    }

    pub fn with_aspect(mut self, aspect: TimeAspect) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_packing(mut self, packing: PackingMode) -> Self {
        self.packing = packing;
        self
    }

    pub fn with_transport_class(mut self, transport_class: TransportClass) -> Self {
        self.transport_class = transport_class;
        self
    }

    pub fn descriptor(&self) -> EntryDescriptor {
        EntryDescriptor {
            label: self.label.clone(),
            data_class: self.data_class.clone(),
            aspect: self.aspect,
            arity: self.arity,
            packing: self.packing,
        }
    }
}

pub(crate) struct WriterState {
    pub(crate) transport_class: TransportClass,
    pub(crate) arity: Arity,
    /// Whether `IsWritingEnd` has been sent for this entry.
    pub(crate) reported: bool,
}
