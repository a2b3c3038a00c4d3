//! # Chanmesh Shared
//! The channel core run by every chanmesh node: identifiers, the entry store,
//! channel ends, the local registry, node 0's channel organisers, the
//! registry coordinator and the access tokens built on top of them.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use chanmesh_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, UnsignedInteger,
    UnsignedVariableInteger,
};

mod channel;
mod context;
mod control;
mod coordinator;
mod end_arena;
mod error;
mod identity;
mod organiser;
mod reaction;
mod registry;
mod store;
mod token;
mod types;

pub use channel::{
    channel_end::{ChannelEnd, MasterInfo},
    frame::{Frame, FrameBody},
    reader::{ReaderConfig, ReaderId},
    writer::WriterConfig,
};
pub use context::ChannelContext;
pub use control::{
    change_notification::ChangeNotification, decode as decode_control,
    encode as encode_control, link_update::LinkUpdate,
};
pub use coordinator::{CoordinatorConfig, RegistryCoordinator, ValueSnapshot};
pub use end_arena::{EndArena, EndHandle};
pub use error::{AccessError, FatalError, OrganiserError, RegistryError};
pub use identity::{channel_end_id::ChannelEndId, channel_name::ChannelName};
pub use organiser::{ChannelOrganiser, EndSpec, OrganiserRecord};
pub use reaction::{ReactionKey, ReactionTarget, Reactive};
pub use registry::{LocalRegistry, RegistryEntry, WaitRoom};
pub use store::{
    entry::{Entry, EntryKey, StoredValue},
    entry_descriptor::{Arity, EntryDescriptor, PackingMode, TimeAspect, TransportClass},
    retention::{Retention, RetentionPolicy},
    selector::{ReadMode, Selector},
    time_window::TimeWindow,
};
pub use token::{ReadAccess, ReadToken, Selection, WriteSlot, WriteToken};
pub use types::{EntryIndex, NodeIndex, ObjectIndex, Tick};
