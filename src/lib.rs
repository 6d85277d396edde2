//! nanolink - packet transport between a phone companion and a BLE peripheral
//!
//! The peripheral is a small embedded controller reachable over a single
//! characteristic with a hard per-write size ceiling. This crate turns typed
//! packets (media metadata, playback commands, time sync) into paced,
//! fragmented frames and reassembles inbound frames back into packets.
//!
//! # Quick Start
//!
//! ```rust
//! use nanolink::{Packet, TimeSyncPacket};
//!
//! let packet = Packet::TimeSync(TimeSyncPacket::new(1_700_000_000_000));
//!
//! // Encode to the packet payload
//! let bytes = packet.encode()?;
//!
//! // Decode using the wire type tag
//! let decoded = Packet::decode(packet.packet_type(), bytes)?;
//! assert_eq!(decoded, packet);
//! # Ok::<(), nanolink::Error>(())
//! ```
//!
//! # Layers
//!
//! - [`protocol`] - binary codec, packet type registry and packet variants
//! - [`transport`] - frames, fragmentation/reassembly, write queue and the
//!   connection state machine driven by a [`Link`] implementation
//! - [`bridge`] - glue between connection events and the media session

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod bridge;
pub mod protocol;
pub mod transport;

pub use protocol::{
    Error, MediaCommand, MediaCommandPacket, MediaInfoPacket, Packet, PacketType, ReadBuffer,
    Result, TimeSyncPacket, WriteBuffer,
};
pub use transport::{Connection, ConnectionState, Link, LinkConfig, LinkEvent};

/// Wire protocol version spoken with the peripheral firmware
pub const PROTOCOL_VERSION: u8 = 1;
