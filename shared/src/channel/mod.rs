pub mod channel_end;
pub mod frame;
pub mod reader;
pub mod writer;
