mod channel_organiser;
mod organiser_record;

pub use channel_organiser::ChannelOrganiser;
pub use organiser_record::{EndSpec, OrganiserRecord};
