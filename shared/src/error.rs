use chanmesh_serde::SerdeErr;
use thiserror::Error;

use crate::{
    identity::{channel_end_id::ChannelEndId, channel_name::ChannelName},
    store::entry_descriptor::TimeAspect,
    types::Tick,
};

/// Failures of a single token operation. These never escalate beyond the
/// caller: the token simply reports the condition and stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The selector found no value for the requested time
    #[error("No data available for the requested time")]
    NoDataAvailable,

    /// The channel end or entry behind the token no longer exists
    #[error("Channel end or entry is missing: it was removed or its slot was reused")]
    MissingChannelEnd,

    /// The token has not been linked, or its link was refused
    #[error("Token is not valid: the channel end is not linked or the write entry was refused")]
    InvalidToken,

    /// A slot is already outstanding on this token
    #[error("Previous access has not been released")]
    AccessNotReleased,

    /// Release was called without a matching acquire
    #[error("Release called without an outstanding access")]
    NotAcquired,

    /// The window does not fit the entry's time aspect
    #[error("Window [{start}, {end}) is not valid for {aspect:?} data")]
    InvalidWindow {
        aspect: TimeAspect,
        start: Tick,
        end: Tick,
    },

    /// The read token has no entry selected
    #[error("No entry is selected on this read token")]
    NoEntrySelected,

    /// Opening this write entry conflicts with the channel's arity or transport class
    #[error("Write entry conflicts with the channel distribution: {reason}")]
    DistributionClash { reason: &'static str },

    /// Every entry index of the channel end is held by an open write entry
    #[error("No free entry index left on this channel end")]
    EntryIndexExhausted,

    /// The node latched a fatal error and refuses all channel access
    #[error("Node is in safety stop")]
    SafetyStop,

    /// The payload could not be decoded as the requested type
    #[error("Payload decode failed: {0}")]
    Decode(#[from] SerdeErr),
}

/// Errors raised by a channel organiser while handling a change notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrganiserError {
    /// A writer's transport class or arity conflicts with the configured master
    #[error("Distribution clash on channel {name}: {reason}")]
    DistributionClash {
        name: ChannelName,
        reason: &'static str,
    },

    /// A removal named an end the organiser never recorded
    #[error("Channel {name} has no record of end {id}")]
    UnknownEnd { name: ChannelName, id: ChannelEndId },

    /// A notification reached an organiser for a different channel
    #[error("Notification for {received} delivered to organiser of {expected}")]
    WrongChannel {
        expected: ChannelName,
        received: ChannelName,
    },
}

/// Errors raised by the local registry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A live entry already exists for this name on this node
    #[error("Channel {name} already has a live end on this node")]
    DuplicateName { name: ChannelName },

    /// A handle referred to a freed or reused slot
    #[error("Stale registry handle for object {object}")]
    StaleHandle { object: u32 },

    /// An organiser-only operation was attempted on a node other than 0
    #[error("Only node 0 hosts channel organisers")]
    NotNodeZero,
}

/// Conditions that desynchronize the distributed registry. Once latched, the
/// node stops processing and hands control to its safe-mode callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// A control message failed to decode
    #[error("Corrupt control message on {channel}: {reason}")]
    CorruptControlMessage {
        channel: ChannelName,
        reason: &'static str,
    },

    /// A control message could not be committed to its channel
    #[error("Irregular control write on {channel}: {source}")]
    IrregularControlWrite {
        channel: ChannelName,
        source: AccessError,
    },

    /// An update contradicts local registry state
    #[error("Acknowledgement mismatch for {name}: {details}")]
    AcknowledgementMismatch { name: ChannelName, details: String },

    /// The organiser was asked to remove an end it does not know
    #[error("Organiser state corrupted: {0}")]
    CorruptedOrganiserState(OrganiserError),

    /// The local registry refused a bootstrap or bookkeeping step
    #[error("Registry bookkeeping failed: {0}")]
    Registry(#[from] RegistryError),
}
