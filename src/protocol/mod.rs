//! Packet protocol core
//!
//! This module provides the binary codec, the packet type registry and the
//! packet variants exchanged with the peripheral.

mod buffer;
mod codec;
mod error;
pub(crate) mod metrics;
mod packet;
mod types;

pub use buffer::{ReadBuffer, WriteBuffer};
pub use codec::{decode, decoder_for, encode, type_of, Decoder};
pub use error::{Error, Result};
pub use metrics::MetricsSnapshot;
pub use packet::{MediaCommandPacket, MediaInfoPacket, Packet, TimeSyncPacket};
pub use types::{MediaCommand, PacketType};

/// Size of an encoded length prefix (`i32`)
pub const LENGTH_PREFIX_SIZE: usize = 4;
