//! Client-facing handles onto channel ends.
//!
//! Opening a token attaches it to this node's end of the channel, creating
//! the end and requesting its id on first use. A token is not usable until
//! the registry has linked its end; poll `is_valid()` or register an
//! `on_valid` reaction on the context.

mod read_token;
mod write_token;

pub use read_token::{ReadAccess, ReadToken, Selection};
pub use write_token::{WriteSlot, WriteToken};
