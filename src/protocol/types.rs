//! Packet type codes and media commands

use std::fmt;

/// Packet type tag carried in byte 0 of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PacketType {
    /// Playback command sent by the peripheral
    MediaCommand = 0x00,
    /// Now-playing metadata pushed to the peripheral
    MediaInfo = 0x01,
    /// Wall clock pushed to the peripheral
    TimeSync = 0x02,
}

impl PacketType {
    /// Every packet type, in wire code order
    pub const ALL: [Self; 3] = [Self::MediaCommand, Self::MediaInfo, Self::TimeSync];

    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::MediaCommand),
            0x01 => Some(Self::MediaInfo),
            0x02 => Some(Self::TimeSync),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MediaCommand => "MediaCommand",
            Self::MediaInfo => "MediaInfo",
            Self::TimeSync => "TimeSync",
        };
        write!(f, "{name}")
    }
}

/// Playback command issued from the peripheral's buttons
///
/// Encoded as an `i32`: `0` toggle, `1` next, `2` previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum MediaCommand {
    /// Toggle between playing and paused
    TogglePlayPause = 0,
    /// Skip to the next track
    Next = 1,
    /// Skip to the previous track
    Previous = 2,
}

impl MediaCommand {
    /// Convert from the wire value
    #[must_use]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::TogglePlayPause),
            1 => Some(Self::Next),
            2 => Some(Self::Previous),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TogglePlayPause => "TogglePlayPause",
            Self::Next => "Next",
            Self::Previous => "Previous",
        };
        write!(f, "{name}")
    }
}
