//! Messages carried by the two bootstrap channels. `ChangeNotification`s
//! travel from any node to node 0 over the request channel; `LinkUpdate`s
//! travel from node 0 to every node over the update channel.

pub mod change_notification;
pub mod link_update;

use chanmesh_serde::{BitReader, BitWriter, Serde, SerdeErr};

/// Encodes a control message into the payload of an Event value.
pub fn encode<M: Serde>(message: &M) -> Box<[u8]> {
    let mut writer = BitWriter::new();
    message.ser(&mut writer);
    writer.to_bytes()
}

/// Decodes a control payload, rejecting trailing bytes.
pub fn decode<M: Serde>(payload: &[u8]) -> Result<M, SerdeErr> {
    let mut reader = BitReader::new(payload);
    let message = M::de(&mut reader)?;
    if reader.has_remaining_bytes() {
        return Err(SerdeErr);
    }
    Ok(message)
}
