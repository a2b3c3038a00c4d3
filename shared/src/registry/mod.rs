mod local_registry;
mod wait_room;

pub use local_registry::{LocalRegistry, RegistryEntry};
pub use wait_room::WaitRoom;
