//! # Chanmesh Node
//! Runs one node of a chanmesh cluster: the channel context, the transport
//! that carries frames to the other nodes and the diagnostic service.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod diagnostics;
pub mod transport;

mod error;
mod node;
mod node_config;

pub use error::NodeError;
pub use node::{Node, PumpReport};
pub use node_config::NodeConfig;
