//! Frame layout written to the characteristic.
//!
//! ```text
//!  0               1               2
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Packet Type  | Index | Total |  Payload ...  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::error::TransportError;

/// Bytes preceding the payload in every frame.
pub const FRAME_HEADER_SIZE: usize = 2;

/// Largest payload carried by one frame.
pub const MAX_FRAME_PAYLOAD: usize = 126;

/// Largest fragment count expressible in the 4-bit total field.
pub const MAX_FRAGMENTS: usize = 15;

/// Write size assumed when the link does not report one.
pub const DEFAULT_MAX_WRITE_LEN: usize = FRAME_HEADER_SIZE + MAX_FRAME_PAYLOAD;

/// Fragment position packed into one byte: index in the high nibble,
/// total in the low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    index: u8,
    total: u8,
}

impl FragmentHeader {
    /// Build a header, rejecting `total == 0`, `total > 15` and `index >= total`.
    pub fn new(index: u8, total: u8) -> Result<Self, TransportError> {
        if total == 0 || usize::from(total) > MAX_FRAGMENTS {
            return Err(TransportError::MalformedFrame {
                len: FRAME_HEADER_SIZE,
                reason: "fragment total out of range",
            });
        }
        if index >= total {
            return Err(TransportError::MalformedFrame {
                len: FRAME_HEADER_SIZE,
                reason: "fragment index beyond total",
            });
        }
        Ok(Self { index, total })
    }

    /// Unpack from the wire byte.
    pub fn from_byte(byte: u8) -> Result<Self, TransportError> {
        Self::new(byte >> 4, byte & 0x0F)
    }

    /// Pack into the wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        (self.index << 4) | self.total
    }

    /// Zero-based fragment index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.index
    }

    /// Number of fragments in the packet.
    #[must_use]
    pub const fn total(self) -> u8 {
        self.total
    }

    /// Whether this is the first fragment.
    #[must_use]
    pub const fn is_first(self) -> bool {
        self.index == 0
    }

    /// Whether this is the last fragment.
    #[must_use]
    pub const fn is_last(self) -> bool {
        self.index + 1 == self.total
    }
}

/// One link write: type tag, fragment header and a payload slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    type_code: u8,
    header: FragmentHeader,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub fn new(type_code: u8, header: FragmentHeader, payload: Bytes) -> Self {
        Self {
            type_code,
            header,
            payload,
        }
    }

    /// Parse an inbound chunk.
    ///
    /// The type code is kept raw; resolving it is the reassembler's job.
    pub fn decode(chunk: Bytes) -> Result<Self, TransportError> {
        if chunk.len() < FRAME_HEADER_SIZE {
            return Err(TransportError::MalformedFrame {
                len: chunk.len(),
                reason: "shorter than frame header",
            });
        }
        let header = FragmentHeader::from_byte(chunk[1]).map_err(|err| match err {
            TransportError::MalformedFrame { reason, .. } => TransportError::MalformedFrame {
                len: chunk.len(),
                reason,
            },
            other => other,
        })?;
        Ok(Self {
            type_code: chunk[0],
            header,
            payload: chunk.slice(FRAME_HEADER_SIZE..),
        })
    }

    /// Serialize for a link write.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        out.put_u8(self.type_code);
        out.put_u8(self.header.as_byte());
        out.put_slice(&self.payload);
        out.freeze()
    }

    /// Length of the encoded frame.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Raw packet type code.
    #[must_use]
    pub const fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Fragment header.
    #[must_use]
    pub const fn header(&self) -> FragmentHeader {
        self.header
    }

    /// Payload slice.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the frame and return the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_nibbles() {
        let header = FragmentHeader::new(3, 7).unwrap();
        assert_eq!(header.as_byte(), 0x37);
        assert_eq!(FragmentHeader::from_byte(0x37).unwrap(), header);
        assert!(!header.is_first());
        assert!(!header.is_last());
        assert!(FragmentHeader::new(6, 7).unwrap().is_last());
    }

    #[test]
    fn header_rejects_impossible_positions() {
        assert!(FragmentHeader::new(0, 0).is_err());
        assert!(FragmentHeader::new(2, 2).is_err());
        assert!(FragmentHeader::from_byte(0xF1).is_err());
    }

    #[test]
    fn short_chunk_is_malformed() {
        assert_eq!(
            Frame::decode(Bytes::from_static(&[0x01])),
            Err(TransportError::MalformedFrame {
                len: 1,
                reason: "shorter than frame header"
            })
        );
        assert!(Frame::decode(Bytes::new()).is_err());
    }

    #[test]
    fn encode_decode() {
        let frame = Frame::new(
            0x01,
            FragmentHeader::new(0, 1).unwrap(),
            Bytes::from_static(b"abc"),
        );
        let wire = frame.encode();
        assert_eq!(wire.as_ref(), &[0x01, 0x01, b'a', b'b', b'c']);
        assert_eq!(Frame::decode(wire).unwrap(), frame);
    }

    #[test]
    fn header_only_frame_has_empty_payload() {
        let frame = Frame::decode(Bytes::from_static(&[0x02, 0x01])).unwrap();
        assert!(frame.payload().is_empty());
        assert_eq!(frame.encoded_len(), FRAME_HEADER_SIZE);
    }
}
