//! Protocol error types

use thiserror::Error;

/// Codec and registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Read past the end of the buffer
    #[error("out of bounds: need {needed} bytes at offset {offset}, buffer holds {len}")]
    OutOfBounds {
        /// Cursor position when the read started
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Total buffer length
        len: usize,
    },

    /// Length prefix was negative
    #[error("negative length prefix: {length}")]
    NegativeLength {
        /// Decoded length value
        length: i32,
    },

    /// Value too long for an `i32` length prefix
    #[error("length {len} does not fit an i32 prefix")]
    LengthOverflow {
        /// Length of the value being encoded
        len: usize,
    },

    /// Unrecognized packet type code
    #[error("unknown packet type: {code:#04x}")]
    UnknownPacketType {
        /// Wire code
        code: u8,
    },

    /// Unrecognized media command value
    #[error("unknown media command: {value}")]
    UnknownMediaCommand {
        /// Decoded command value
        value: i32,
    },

    /// Invalid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
