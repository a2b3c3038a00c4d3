use chanmesh_shared::{AccessError, FatalError};
use thiserror::Error;

/// Errors surfaced by `Node`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The channel core hit a node-wide fatal condition and stopped
    #[error("Node stopped: {0}")]
    SafetyStop(FatalError),

    /// The channel core could not be bootstrapped
    #[error("Node bootstrap failed: {0}")]
    Bootstrap(FatalError),

    /// The diagnostic service could not open its channels
    #[error("Diagnostic service unavailable: {0}")]
    Diagnostics(#[from] AccessError),

    /// The transport refused an outgoing frame
    #[error("Failed to send a frame to node {node}")]
    Send { node: u16 },

    /// The transport's incoming queue is closed
    #[error("Failed to receive frames: the transport is closed")]
    Receive,
}
