//! Packet registry and codec (encode/decode)
//!
//! The registry is a closed mapping between [`PacketType`] codes and packet
//! decoders. Adding a variant means extending [`PacketType`], [`Packet`] and
//! the matches below; the compiler rejects a missing arm.

use bytes::Bytes;
use tracing::{debug, trace};

use super::{
    Error, MediaCommandPacket, MediaInfoPacket, Packet, PacketType, ReadBuffer, Result,
    TimeSyncPacket, WriteBuffer,
};

/// Decoder for a single packet variant
pub type Decoder = fn(&mut ReadBuffer) -> Result<Packet>;

/// Wire type of a packet
#[must_use]
pub const fn type_of(packet: &Packet) -> PacketType {
    packet.packet_type()
}

/// Look up the decoder for a raw type code
pub fn decoder_for(code: u8) -> Result<Decoder> {
    let packet_type = PacketType::from_u8(code).ok_or(Error::UnknownPacketType { code })?;
    Ok(decoder(packet_type))
}

fn decoder(packet_type: PacketType) -> Decoder {
    match packet_type {
        PacketType::MediaCommand => decode_media_command,
        PacketType::MediaInfo => decode_media_info,
        PacketType::TimeSync => decode_time_sync,
    }
}

fn decode_media_command(buffer: &mut ReadBuffer) -> Result<Packet> {
    MediaCommandPacket::decode(buffer).map(Packet::MediaCommand)
}

fn decode_media_info(buffer: &mut ReadBuffer) -> Result<Packet> {
    MediaInfoPacket::decode(buffer).map(Packet::MediaInfo)
}

fn decode_time_sync(buffer: &mut ReadBuffer) -> Result<Packet> {
    TimeSyncPacket::decode(buffer).map(Packet::TimeSync)
}

/// Encode a packet payload
///
/// # Format
///
/// The payload carries only the packet fields; the type tag travels in the
/// frame header.
pub fn encode(packet: &Packet) -> Result<Bytes> {
    let mut buffer = WriteBuffer::new();
    packet.encode_into(&mut buffer)?;
    trace!(packet_type = %packet.packet_type(), len = buffer.len(), "encoded packet");
    Ok(buffer.freeze())
}

/// Decode a packet payload
///
/// Trailing bytes after the last field are tolerated and logged.
///
/// # Errors
///
/// Returns an error if:
/// - a field reads past the end of the payload
/// - a string is not valid UTF-8 or has a negative length
/// - a media command value is unknown
pub fn decode(packet_type: PacketType, bytes: Bytes) -> Result<Packet> {
    let mut buffer = ReadBuffer::new(bytes);
    let packet = decoder(packet_type)(&mut buffer)?;
    if buffer.has_more() {
        debug!(
            %packet_type,
            trailing = buffer.remaining(),
            "ignoring trailing bytes after packet"
        );
    }
    Ok(packet)
}
