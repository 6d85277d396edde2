//! Fragmentation of encoded packets and single-flight reassembly.
//!
//! Only one inbound packet is reassembled at a time. Any anomaly drops the
//! partial packet; the peer resends the whole packet.

use std::mem;

use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use super::error::TransportError;
use super::frame::{FRAME_HEADER_SIZE, FragmentHeader, Frame, MAX_FRAGMENTS, MAX_FRAME_PAYLOAD};
use crate::protocol::{Error, PacketType};

/// Per-frame payload size for a link with the given maximum write length.
///
/// Capped at [`MAX_FRAME_PAYLOAD`]. A link must accept at least the frame
/// header plus one payload byte; anything smaller is rejected.
pub fn payload_size_for(max_write_len: usize) -> Result<usize, TransportError> {
    if max_write_len <= FRAME_HEADER_SIZE {
        return Err(TransportError::WriteLenTooSmall { max_write_len });
    }
    Ok((max_write_len - FRAME_HEADER_SIZE).min(MAX_FRAME_PAYLOAD))
}

/// Split an encoded payload into ordered frames of at most `max_payload` bytes.
///
/// An empty payload still yields a single header-only frame.
pub fn fragment(
    packet_type: PacketType,
    payload: &Bytes,
    max_payload: usize,
) -> Result<Vec<Frame>, TransportError> {
    let max_payload = max_payload.clamp(1, MAX_FRAME_PAYLOAD);
    let fragments = payload.len().div_ceil(max_payload).max(1);
    if fragments > MAX_FRAGMENTS {
        return Err(TransportError::PacketTooLarge {
            len: payload.len(),
            fragments,
            max: MAX_FRAGMENTS,
        });
    }

    // Bounded by MAX_FRAGMENTS above.
    #[allow(clippy::cast_possible_truncation)]
    let total = fragments as u8;
    let mut frames = Vec::with_capacity(fragments);
    for index in 0..total {
        let start = usize::from(index) * max_payload;
        let end = (start + max_payload).min(payload.len());
        frames.push(Frame::new(
            packet_type.as_u8(),
            FragmentHeader::new(index, total)?,
            payload.slice(start..end),
        ));
    }
    trace!(%packet_type, len = payload.len(), fragments, "fragmented packet");
    Ok(frames)
}

/// Complete packet payload produced by the reassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// Type recorded from fragment 0.
    pub packet_type: PacketType,
    /// Concatenated fragment payloads.
    pub payload: Bytes,
}

/// Observable reassembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyPhase {
    /// Waiting for fragment 0.
    Idle,
    /// Between fragment 0 and the last fragment.
    Accumulating {
        /// Packet being assembled.
        packet_type: PacketType,
        /// Fragments accepted so far.
        received: u8,
        /// Fragments announced by fragment 0.
        expected: u8,
    },
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Accumulating(Accumulator),
}

#[derive(Debug)]
struct Accumulator {
    packet_type: PacketType,
    expected: u8,
    received: u8,
    buffer: BytesMut,
}

/// Inbound fragment accumulator.
#[derive(Debug, Default)]
pub struct Reassembler {
    state: State,
}

impl Reassembler {
    /// Create an idle reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame.
    ///
    /// Returns the complete payload once the last fragment arrives. On error
    /// the reassembler is back to idle.
    pub fn push(&mut self, frame: &Frame) -> Result<Option<Reassembled>, TransportError> {
        let header = frame.header();

        if header.is_first() {
            if let State::Accumulating(acc) = &self.state {
                warn!(
                    packet_type = %acc.packet_type,
                    received = acc.received,
                    expected = acc.expected,
                    "new packet started before previous completed; discarding partial packet"
                );
            }
            self.state = State::Idle;
            let packet_type = PacketType::from_u8(frame.type_code()).ok_or(
                Error::UnknownPacketType {
                    code: frame.type_code(),
                },
            )?;
            self.state = State::Accumulating(Accumulator {
                packet_type,
                expected: header.total(),
                received: 1,
                buffer: BytesMut::from(frame.payload().as_ref()),
            });
        } else {
            let State::Accumulating(mut acc) = mem::take(&mut self.state) else {
                return Err(TransportError::OutOfOrderFragment {
                    expected: 0,
                    got: header.index(),
                });
            };
            if header.index() != acc.received {
                return Err(TransportError::OutOfOrderFragment {
                    expected: acc.received,
                    got: header.index(),
                });
            }
            if frame.type_code() != acc.packet_type.as_u8() || header.total() != acc.expected {
                return Err(TransportError::FragmentMismatch {
                    expected_type: acc.packet_type.as_u8(),
                    got_type: frame.type_code(),
                    expected_total: acc.expected,
                    got_total: header.total(),
                });
            }
            acc.buffer.extend_from_slice(frame.payload());
            acc.received += 1;
            self.state = State::Accumulating(acc);
        }

        trace!(
            index = header.index(),
            total = header.total(),
            len = frame.payload().len(),
            "accepted fragment"
        );
        Ok(self.take_complete())
    }

    fn take_complete(&mut self) -> Option<Reassembled> {
        match &self.state {
            State::Accumulating(acc) if acc.received == acc.expected => {}
            _ => return None,
        }
        match mem::take(&mut self.state) {
            State::Accumulating(acc) => Some(Reassembled {
                packet_type: acc.packet_type,
                payload: acc.buffer.freeze(),
            }),
            State::Idle => None,
        }
    }

    /// Drop any partial packet.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Whether no packet is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ReassemblyPhase {
        match &self.state {
            State::Idle => ReassemblyPhase::Idle,
            State::Accumulating(acc) => ReassemblyPhase::Accumulating {
                packet_type: acc.packet_type,
                received: acc.received,
                expected: acc.expected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Bytes {
        #[allow(clippy::cast_possible_truncation)]
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        bytes.into()
    }

    #[test]
    fn payload_size_follows_link() {
        assert_eq!(payload_size_for(128), Ok(126));
        assert_eq!(payload_size_for(512), Ok(126));
        assert_eq!(payload_size_for(23), Ok(21));
        assert_eq!(payload_size_for(3), Ok(1));
    }

    #[test]
    fn write_len_without_room_for_payload_rejected() {
        for max_write_len in 0..=FRAME_HEADER_SIZE {
            assert_eq!(
                payload_size_for(max_write_len),
                Err(TransportError::WriteLenTooSmall { max_write_len })
            );
        }
    }

    #[test]
    fn splits_at_payload_boundary() {
        let frames = fragment(PacketType::MediaInfo, &payload(300), 126).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload().len(), 126);
        assert_eq!(frames[1].payload().len(), 126);
        assert_eq!(frames[2].payload().len(), 48);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(usize::from(frame.header().index()), i);
            assert_eq!(frame.header().total(), 3);
            assert_eq!(frame.type_code(), PacketType::MediaInfo.as_u8());
        }
    }

    #[test]
    fn empty_payload_yields_one_frame() {
        let frames = fragment(PacketType::TimeSync, &Bytes::new(), 126).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn too_many_fragments_rejected() {
        let max = MAX_FRAGMENTS * 126;
        assert_eq!(fragment(PacketType::MediaInfo, &payload(max), 126).unwrap().len(), 15);
        assert_eq!(
            fragment(PacketType::MediaInfo, &payload(max + 1), 126),
            Err(TransportError::PacketTooLarge {
                len: max + 1,
                fragments: 16,
                max: MAX_FRAGMENTS
            })
        );
        assert!(matches!(
            fragment(PacketType::MediaInfo, &payload(16 * 126 + 1), 126),
            Err(TransportError::PacketTooLarge { fragments: 17, .. })
        ));
    }

    #[test]
    fn single_frame_completes_immediately() {
        let mut reassembler = Reassembler::new();
        let frames = fragment(PacketType::TimeSync, &payload(8), 126).unwrap();
        let done = reassembler.push(&frames[0]).unwrap().unwrap();
        assert_eq!(done.packet_type, PacketType::TimeSync);
        assert_eq!(done.payload, payload(8));
        assert!(reassembler.is_idle());
    }

    #[test]
    fn skipped_fragment_resets_until_fresh_start() {
        let data = payload(300);
        let frames = fragment(PacketType::MediaInfo, &data, 126).unwrap();
        let mut reassembler = Reassembler::new();

        assert_eq!(reassembler.push(&frames[0]).unwrap(), None);
        assert_eq!(
            reassembler.push(&frames[2]),
            Err(TransportError::OutOfOrderFragment {
                expected: 1,
                got: 2
            })
        );
        assert!(reassembler.is_idle());

        // Continuations without a fresh fragment 0 are stray.
        assert!(matches!(
            reassembler.push(&frames[1]),
            Err(TransportError::OutOfOrderFragment { expected: 0, got: 1 })
        ));

        assert_eq!(reassembler.push(&frames[0]).unwrap(), None);
        assert_eq!(reassembler.push(&frames[1]).unwrap(), None);
        let done = reassembler.push(&frames[2]).unwrap().unwrap();
        assert_eq!(done.payload, data);
    }

    #[test]
    fn duplicate_fragment_resets() {
        let frames = fragment(PacketType::MediaInfo, &payload(300), 126).unwrap();
        let mut reassembler = Reassembler::new();
        reassembler.push(&frames[0]).unwrap();
        reassembler.push(&frames[1]).unwrap();
        assert!(reassembler.push(&frames[1]).is_err());
        assert_eq!(reassembler.phase(), ReassemblyPhase::Idle);
    }

    #[test]
    fn unknown_type_stays_idle() {
        let frame = Frame::new(0x09, FragmentHeader::new(0, 2).unwrap(), payload(4));
        let mut reassembler = Reassembler::new();
        assert_eq!(
            reassembler.push(&frame),
            Err(TransportError::Protocol(Error::UnknownPacketType { code: 0x09 }))
        );
        assert!(reassembler.is_idle());
    }

    #[test]
    fn mismatched_continuation_resets() {
        let frames = fragment(PacketType::MediaInfo, &payload(200), 126).unwrap();
        let forged = Frame::new(
            PacketType::TimeSync.as_u8(),
            frames[1].header(),
            frames[1].payload().clone(),
        );
        let mut reassembler = Reassembler::new();
        reassembler.push(&frames[0]).unwrap();
        assert!(matches!(
            reassembler.push(&forged),
            Err(TransportError::FragmentMismatch { .. })
        ));
        assert!(reassembler.is_idle());
    }

    #[test]
    fn restart_mid_packet_discards_partial() {
        let first = fragment(PacketType::MediaInfo, &payload(300), 126).unwrap();
        let second = fragment(PacketType::TimeSync, &Bytes::from_static(&[1; 8]), 126).unwrap();
        let mut reassembler = Reassembler::new();
        reassembler.push(&first[0]).unwrap();
        assert_eq!(
            reassembler.phase(),
            ReassemblyPhase::Accumulating {
                packet_type: PacketType::MediaInfo,
                received: 1,
                expected: 3
            }
        );
        let done = reassembler.push(&second[0]).unwrap().unwrap();
        assert_eq!(done.packet_type, PacketType::TimeSync);
        assert_eq!(done.payload.as_ref(), &[1; 8]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn sized_payload() -> impl Strategy<Value = (usize, Vec<u8>)> {
            (1usize..=MAX_FRAME_PAYLOAD).prop_flat_map(|max_payload| {
                (
                    Just(max_payload),
                    prop::collection::vec(any::<u8>(), 1..=max_payload * MAX_FRAGMENTS),
                )
            })
        }

        proptest! {
            /// Property: in-order frames reassemble to the original bytes
            #[test]
            fn prop_fragment_roundtrip((max_payload, data) in sized_payload()) {
                let data = Bytes::from(data);
                let frames = fragment(PacketType::MediaInfo, &data, max_payload).unwrap();
                prop_assert!(frames.len() <= MAX_FRAGMENTS);

                let mut reassembler = Reassembler::new();
                let mut completed = None;
                for (i, frame) in frames.iter().enumerate() {
                    prop_assert!(frame.encoded_len() <= max_payload + FRAME_HEADER_SIZE);
                    let wire = Frame::decode(frame.encode()).unwrap();
                    let result = reassembler.push(&wire).unwrap();
                    if i + 1 < frames.len() {
                        prop_assert!(result.is_none());
                    } else {
                        completed = result;
                    }
                }
                let completed = completed.expect("last fragment completes the packet");
                prop_assert_eq!(completed.payload, data);
                prop_assert!(reassembler.is_idle());
            }

            /// Property: dropping any middle fragment never yields a packet
            #[test]
            fn prop_gap_never_completes(
                data in prop::collection::vec(any::<u8>(), 253..=1890),
                skip_ratio in 0.0f64..1.0,
            ) {
                let data = Bytes::from(data);
                let frames = fragment(PacketType::MediaInfo, &data, MAX_FRAME_PAYLOAD).unwrap();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
                let skip = 1 + ((frames.len() - 1) as f64 * skip_ratio) as usize;
                let skip = skip.min(frames.len() - 1);

                let mut reassembler = Reassembler::new();
                for (i, frame) in frames.iter().enumerate() {
                    if i == skip {
                        continue;
                    }
                    if let Ok(result) = reassembler.push(frame) {
                        prop_assert!(result.is_none());
                    }
                }
                prop_assert!(reassembler.is_idle() || skip == frames.len() - 1);
            }
        }
    }
}
