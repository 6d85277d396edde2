//! Transport-level error types covering frames, fragments, writes and link state.

use thiserror::Error;

use super::connection::ConnectionState;
use super::link::LinkError;
use crate::protocol::{self, PacketType};

/// Unified error type for transport operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Frame shorter than its header or carrying an impossible fragment header.
    #[error("malformed frame ({len} bytes): {reason}")]
    MalformedFrame {
        /// Length of the rejected chunk.
        len: usize,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Fragment arrived out of sequence; the partial packet was discarded.
    #[error("out of order fragment: expected index {expected}, got {got}")]
    OutOfOrderFragment {
        /// Next index the reassembler was waiting for.
        expected: u8,
        /// Index that arrived.
        got: u8,
    },

    /// Continuation fragment disagrees with the first fragment of its packet.
    #[error(
        "fragment mismatch: expected type {expected_type:#04x}/{expected_total} fragments, got {got_type:#04x}/{got_total}"
    )]
    FragmentMismatch {
        /// Type code recorded from fragment 0.
        expected_type: u8,
        /// Type code carried by the offending fragment.
        got_type: u8,
        /// Fragment count recorded from fragment 0.
        expected_total: u8,
        /// Fragment count carried by the offending fragment.
        got_total: u8,
    },

    /// Encoded packet needs more fragments than the header can express.
    #[error("packet too large: {len} bytes needs {fragments} fragments (max {max})")]
    PacketTooLarge {
        /// Encoded payload length.
        len: usize,
        /// Fragments the payload would need.
        fragments: usize,
        /// Maximum fragments per packet.
        max: usize,
    },

    /// The link's maximum write cannot hold a frame header and one payload byte.
    #[error("link write size {max_write_len} leaves no room for frame payload")]
    WriteLenTooSmall {
        /// Maximum write length reported by the link.
        max_write_len: usize,
    },

    /// A frame write kept failing until the attempt ceiling was reached.
    #[error("send failed: {packet_type} fragment {fragment} after {attempts} attempts")]
    SendFailed {
        /// Type of the dropped packet.
        packet_type: PacketType,
        /// Fragment index that could not be written.
        fragment: u8,
        /// Attempts made.
        attempts: u32,
        /// Last link failure.
        #[source]
        source: LinkError,
    },

    /// The link went down; transient state was reset.
    #[error("link down")]
    LinkDown,

    /// Event does not apply to the current connection state.
    #[error("cannot handle {event} while {state}")]
    InvalidState {
        /// Current state.
        state: ConnectionState,
        /// Event that was rejected.
        event: &'static str,
    },

    /// Link collaborator failure outside the write path.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Packet codec failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::Error),
}
