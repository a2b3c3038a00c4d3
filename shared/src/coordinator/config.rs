use std::default::Default;

use crate::types::NodeIndex;

/// Contains Config properties which will be used by a node's RegistryCoordinator
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Index of this node. Node 0 hosts every channel organiser.
    pub location: NodeIndex,
    /// Number of nodes in the cluster. Node 0 links its update channel to
    /// every other node at bootstrap.
    pub node_count: NodeIndex,
    /// Upper bound on drain rounds per `process_control` call, so a chatty
    /// control channel cannot starve the caller.
    pub control_batch_limit: usize,
}

impl CoordinatorConfig {
    pub fn new(location: NodeIndex, node_count: NodeIndex) -> Self {
        Self {
            location,
            node_count,
            ..Self::default()
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            location: 0,
            node_count: 1,
            control_batch_limit: 64,
        }
    }
}
