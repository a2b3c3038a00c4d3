mod config;
mod registry_coordinator;

pub use config::CoordinatorConfig;
pub use registry_coordinator::{RegistryCoordinator, ValueSnapshot};
