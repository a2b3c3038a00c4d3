pub mod entry;
pub mod entry_descriptor;
pub mod retention;
pub mod selector;
pub mod time_window;
