//! Packet variants

use bytes::Bytes;

use super::{Error, MediaCommand, PacketType, ReadBuffer, Result, WriteBuffer};

/// Playback command from the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaCommandPacket {
    command: MediaCommand,
}

impl MediaCommandPacket {
    /// Create a command packet
    #[must_use]
    pub const fn new(command: MediaCommand) -> Self {
        Self { command }
    }

    /// Requested command
    #[must_use]
    pub const fn command(&self) -> MediaCommand {
        self.command
    }

    pub(crate) fn encode(&self, buffer: &mut WriteBuffer) {
        buffer.write_int(self.command.as_i32());
    }

    pub(crate) fn decode(buffer: &mut ReadBuffer) -> Result<Self> {
        let value = buffer.read_int()?;
        let command = MediaCommand::from_i32(value).ok_or(Error::UnknownMediaCommand { value })?;
        Ok(Self { command })
    }
}

/// Now-playing metadata
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaInfoPacket {
    /// Track title
    pub title: String,
    /// Track artist
    pub artist: String,
    /// Album name
    pub album: String,
    /// Track length in milliseconds, `-1` when unknown
    pub duration: i64,
    /// Playback position in milliseconds
    pub position: i64,
    /// Whether playback is running
    pub is_playing: bool,
}

impl MediaInfoPacket {
    pub(crate) fn encode(&self, buffer: &mut WriteBuffer) -> Result<()> {
        buffer.write_string(&self.title)?;
        buffer.write_string(&self.artist)?;
        buffer.write_string(&self.album)?;
        buffer.write_long(self.duration);
        buffer.write_long(self.position);
        buffer.write_bool(self.is_playing);
        Ok(())
    }

    pub(crate) fn decode(buffer: &mut ReadBuffer) -> Result<Self> {
        Ok(Self {
            title: buffer.read_string()?,
            artist: buffer.read_string()?,
            album: buffer.read_string()?,
            duration: buffer.read_long()?,
            position: buffer.read_long()?,
            is_playing: buffer.read_bool()?,
        })
    }
}

/// Wall clock for the peripheral, in local-time adjusted epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSyncPacket {
    timestamp_millis: i64,
}

impl TimeSyncPacket {
    /// Create from a local-time adjusted timestamp
    #[must_use]
    pub const fn new(timestamp_millis: i64) -> Self {
        Self { timestamp_millis }
    }

    /// Build from the host's local clock
    #[must_use]
    pub fn now_local() -> Self {
        Self::from_local(chrono::Local::now().naive_local())
    }

    /// Build from a local wall-clock time; the peripheral has no timezone
    /// database so the offset is folded into the epoch value.
    #[must_use]
    pub fn from_local(local: chrono::NaiveDateTime) -> Self {
        Self::new(local.and_utc().timestamp_millis())
    }

    /// Timestamp in milliseconds
    #[must_use]
    pub const fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub(crate) fn encode(&self, buffer: &mut WriteBuffer) {
        buffer.write_long(self.timestamp_millis);
    }

    pub(crate) fn decode(buffer: &mut ReadBuffer) -> Result<Self> {
        Ok(Self {
            timestamp_millis: buffer.read_long()?,
        })
    }
}

/// Every packet exchanged with the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Packet {
    /// Playback command
    MediaCommand(MediaCommandPacket),
    /// Now-playing metadata
    MediaInfo(MediaInfoPacket),
    /// Clock sync
    TimeSync(TimeSyncPacket),
}

impl Packet {
    /// Wire type tag for this packet
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::MediaCommand(_) => PacketType::MediaCommand,
            Self::MediaInfo(_) => PacketType::MediaInfo,
            Self::TimeSync(_) => PacketType::TimeSync,
        }
    }

    /// Append the packet payload (without type tag) to `buffer`
    pub fn encode_into(&self, buffer: &mut WriteBuffer) -> Result<()> {
        match self {
            Self::MediaCommand(packet) => packet.encode(buffer),
            Self::MediaInfo(packet) => packet.encode(buffer)?,
            Self::TimeSync(packet) => packet.encode(buffer),
        }
        Ok(())
    }

    /// Encode the packet payload
    pub fn encode(&self) -> Result<Bytes> {
        super::encode(self)
    }

    /// Decode a payload using the type tag it arrived with
    pub fn decode(packet_type: PacketType, bytes: impl Into<Bytes>) -> Result<Self> {
        super::decode(packet_type, bytes.into())
    }
}

impl From<MediaCommandPacket> for Packet {
    fn from(packet: MediaCommandPacket) -> Self {
        Self::MediaCommand(packet)
    }
}

impl From<MediaInfoPacket> for Packet {
    fn from(packet: MediaInfoPacket) -> Self {
        Self::MediaInfo(packet)
    }
}

impl From<TimeSyncPacket> for Packet {
    fn from(packet: TimeSyncPacket) -> Self {
        Self::TimeSync(packet)
    }
}
