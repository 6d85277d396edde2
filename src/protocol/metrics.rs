use std::sync::atomic::{AtomicU64, Ordering};

use super::PacketType;

/// Per-connection packet counters, lock-free.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    write_retries: AtomicU64,
    send_failures: AtomicU64,
    inbound_drops: AtomicU64,
    by_type: PacketTypeCounters,
}

#[derive(Debug, Default)]
struct PacketTypeCounters {
    media_command: AtomicU64,
    media_info: AtomicU64,
    time_sync: AtomicU64,
}

impl PacketTypeCounters {
    fn increment(&self, packet_type: PacketType) {
        let counter = match packet_type {
            PacketType::MediaCommand => &self.media_command,
            PacketType::MediaInfo => &self.media_info,
            PacketType::TimeSync => &self.time_sync,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Direction of packet flow for counting.
#[derive(Clone, Copy)]
pub(crate) enum PacketDirection {
    Sent,
    Received,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_packet(&self, direction: PacketDirection, packet_type: PacketType) {
        match direction {
            PacketDirection::Sent => {
                self.packets_sent.fetch_add(1, Ordering::Relaxed);
            }
            PacketDirection::Received => {
                self.packets_received.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.by_type.increment(packet_type);
    }

    #[inline]
    pub(crate) fn record_frame(&self, direction: PacketDirection) {
        let counter = match direction {
            PacketDirection::Sent => &self.frames_sent,
            PacketDirection::Received => &self.frames_received,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_retry(&self) {
        self.write_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_inbound_drop(&self) {
        self.inbound_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            write_retries: self.write_retries.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            inbound_drops: self.inbound_drops.load(Ordering::Relaxed),
            media_command_packets: self.by_type.media_command.load(Ordering::Relaxed),
            media_info_packets: self.by_type.media_info.load(Ordering::Relaxed),
            time_sync_packets: self.by_type.time_sync.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a connection's counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Packets fully written to the link
    pub packets_sent: u64,
    /// Packets reassembled and decoded
    pub packets_received: u64,
    /// Frames written to the link
    pub frames_sent: u64,
    /// Frames accepted from the link
    pub frames_received: u64,
    /// Frame writes that had to be retried
    pub write_retries: u64,
    /// Packets dropped after exhausting write attempts
    pub send_failures: u64,
    /// Inbound frames or packets discarded
    pub inbound_drops: u64,
    /// Media command packets in either direction
    pub media_command_packets: u64,
    /// Media info packets in either direction
    pub media_info_packets: u64,
    /// Time sync packets in either direction
    pub time_sync_packets: u64,
}

impl MetricsSnapshot {
    /// Share of frame writes that needed a retry, `None` before any frame is sent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn retry_ratio(&self) -> Option<f64> {
        if self.frames_sent == 0 {
            return None;
        }
        Some(self.write_retries as f64 / self.frames_sent as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_direction_and_type() {
        let metrics = Metrics::default();
        metrics.record_packet(PacketDirection::Sent, PacketType::MediaInfo);
        metrics.record_packet(PacketDirection::Received, PacketType::MediaCommand);
        metrics.record_frame(PacketDirection::Sent);
        metrics.record_frame(PacketDirection::Sent);
        metrics.record_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_sent, 1);
        assert_eq!(snapshot.packets_received, 1);
        assert_eq!(snapshot.media_info_packets, 1);
        assert_eq!(snapshot.media_command_packets, 1);
        assert_eq!(snapshot.time_sync_packets, 0);
        assert_eq!(snapshot.retry_ratio(), Some(0.5));
    }

    #[test]
    fn retry_ratio_empty() {
        assert_eq!(MetricsSnapshot::default().retry_ratio(), None);
    }
}
