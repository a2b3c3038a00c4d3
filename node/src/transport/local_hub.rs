use smol::channel::{self, Receiver, Sender, TryRecvError};

use chanmesh_shared::NodeIndex;

use super::{PacketReceiver, PacketSender, RecvError, SendError};

/// In-process transport connecting every node of a cluster through unbounded
/// channels. Delivery is FIFO per sender.
pub struct LocalHub;

impl LocalHub {
    /// Creates one sender/receiver pair per node, indexed by node.
    pub fn new(node_count: NodeIndex) -> Vec<(Box<dyn PacketSender>, Box<dyn PacketReceiver>)> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..node_count).map(|_| channel::unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(index, receiver)| {
                let sender: Box<dyn PacketSender> = Box::new(HubSender {
                    origin: index as NodeIndex,
                    peers: senders.clone(),
                });
                let receiver: Box<dyn PacketReceiver> = Box::new(HubReceiver {
                    receiver,
                    current_payload: None,
                });
                (sender, receiver)
            })
            .collect()
    }
}

struct HubSender {
    origin: NodeIndex,
    peers: Vec<Sender<(NodeIndex, Box<[u8]>)>>,
}

impl PacketSender for HubSender {
    fn send(&self, node: NodeIndex, payload: &[u8]) -> Result<(), SendError> {
        let peer = self.peers.get(node as usize).ok_or(SendError)?;
        peer.try_send((self.origin, payload.into()))
            .map_err(|_| SendError)
    }
}

struct HubReceiver {
    receiver: Receiver<(NodeIndex, Box<[u8]>)>,
    current_payload: Option<Box<[u8]>>,
}

impl PacketReceiver for HubReceiver {
    fn receive(&mut self) -> Result<Option<(NodeIndex, &[u8])>, RecvError> {
        match self.receiver.try_recv() {
            Ok((origin, payload)) => {
                let payload: &[u8] = self.current_payload.insert(payload);
                Ok(Some((origin, payload)))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(_) => Err(RecvError),
        }
    }
}
