pub mod channel_end_id;
pub mod channel_name;
