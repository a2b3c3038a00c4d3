use std::default::Default;

use chanmesh_shared::CoordinatorConfig;

/// Contains Config properties which will be used by a Node
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Used to configure the node's registry coordinator
    pub coordinator: CoordinatorConfig,
    /// Determines whether the node answers count and monitor requests
    pub diagnostics: bool,
    /// Upper bound on frames taken from the transport in one pump
    pub max_frames_per_pump: usize,
}

impl NodeConfig {
    pub fn new(location: u16, node_count: u16) -> Self {
        Self {
            coordinator: CoordinatorConfig::new(location, node_count),
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            diagnostics: true,
            max_frames_per_pump: 4096,
        }
    }
}
