mod local_hub;

pub use local_hub::LocalHub;
pub use inner::{PacketReceiver, PacketSender, RecvError, SendError};

mod inner {
    use chanmesh_shared::NodeIndex;
    use thiserror::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
    #[error("Transport refused the packet")]
    pub struct SendError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
    #[error("Transport is closed")]
    pub struct RecvError;

    /// Used to send packets to other nodes of the cluster
    pub trait PacketSender: Send + Sync {
        /// Sends a packet to the node at `node`
        fn send(&self, node: NodeIndex, payload: &[u8]) -> Result<(), SendError>;
    }

    /// Used to receive packets from other nodes of the cluster
    pub trait PacketReceiver: Send + Sync {
        /// Receives the next packet and the index of the node that sent it
        fn receive(&mut self) -> Result<Option<(NodeIndex, &[u8])>, RecvError>;
    }
}
