//! Link-layer transport: frames, fragmentation, paced writes and the
//! connection state machine.

mod config;
mod connection;
mod error;
mod fragment;
mod frame;
mod link;
mod queue;

pub use config::{GattProfile, LinkConfig};
pub use connection::{Connection, ConnectionState, LinkEvent};
pub use error::TransportError;
pub use fragment::{fragment, payload_size_for, Reassembled, Reassembler, ReassemblyPhase};
pub use frame::{
    DEFAULT_MAX_WRITE_LEN, FRAME_HEADER_SIZE, FragmentHeader, Frame, MAX_FRAGMENTS,
    MAX_FRAME_PAYLOAD,
};
pub use link::{Link, LinkError};
pub use queue::WriteQueue;
