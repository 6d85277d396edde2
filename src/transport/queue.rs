//! Single-flight outbound write queue with retry and pacing.
//!
//! The first caller to enqueue into an idle queue becomes the drainer and
//! writes every queued packet before returning; concurrent callers only
//! append. A disconnect closes the queue and bumps its epoch, which aborts
//! the packet in flight at its next write attempt or pause. A closed queue
//! refuses packets until it is opened again.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, instrument, trace, warn};

use super::config::LinkConfig;
use super::error::TransportError;
use super::fragment::{fragment, payload_size_for};
use super::frame::Frame;
use super::link::Link;
use crate::protocol::metrics::{Metrics, PacketDirection};
use crate::protocol::{Packet, PacketType};

/// Encoded packet waiting for the link.
#[derive(Debug)]
struct QueuedPacket {
    packet_type: PacketType,
    frames: Vec<Bytes>,
    len: usize,
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: VecDeque<QueuedPacket>,
    writing: bool,
    open: bool,
}

/// Releases the drain role if the link panics mid-write.
struct DrainGuard<'a>(&'a Mutex<QueueInner>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).writing = false;
        }
    }
}

/// FIFO of outbound packets written one frame at a time.
#[derive(Debug)]
pub struct WriteQueue<L: ?Sized> {
    link: Arc<L>,
    config: LinkConfig,
    inner: Mutex<QueueInner>,
    epoch: AtomicU64,
    metrics: Arc<Metrics>,
}

impl<L: Link + ?Sized> WriteQueue<L> {
    /// Create an open queue writing to `link`.
    #[must_use]
    pub fn new(link: Arc<L>, config: LinkConfig) -> Self {
        let queue = Self::with_metrics(link, config, Arc::default());
        queue.open();
        queue
    }

    /// Closed queue sharing the connection's counters.
    pub(crate) fn with_metrics(link: Arc<L>, config: LinkConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            link,
            config,
            inner: Mutex::default(),
            epoch: AtomicU64::new(0),
            metrics,
        }
    }

    /// Encode, fragment and queue a packet.
    ///
    /// Oversized packets are rejected here, before any frame is written, and a
    /// closed queue fails with [`TransportError::LinkDown`]. If no drain is in
    /// progress the calling thread drains the queue, blocking for the paced
    /// writes of every queued packet.
    #[instrument(level = "debug", skip(self, packet), fields(packet_type = %packet.packet_type()))]
    pub fn enqueue(&self, packet: &Packet) -> Result<(), TransportError> {
        let payload = packet.encode()?;
        let max_payload = self
            .config
            .max_frame_payload
            .min(payload_size_for(self.link.max_write_len())?);
        let frames = fragment(packet.packet_type(), &payload, max_payload)?
            .iter()
            .map(Frame::encode)
            .collect::<Vec<_>>();

        {
            let mut inner = self.lock();
            if !inner.open {
                debug!("queue closed; rejecting packet");
                return Err(TransportError::LinkDown);
            }
            inner.pending.push_back(QueuedPacket {
                packet_type: packet.packet_type(),
                frames,
                len: payload.len(),
            });
            trace!(queued = inner.pending.len(), "packet queued");
            if inner.writing {
                return Ok(());
            }
            inner.writing = true;
        }

        self.drain();
        Ok(())
    }

    /// Accept packets again.
    pub fn open(&self) {
        self.lock().open = true;
    }

    /// Whether packets are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Close the queue, drop every queued packet and abort the one in flight.
    ///
    /// Returns the number of packets discarded from the queue.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        inner.open = false;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let dropped = inner.pending.len();
        inner.pending.clear();
        if dropped > 0 {
            debug!(dropped, "cleared outbound queue");
        }
        dropped
    }

    /// Packets waiting behind the one in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether no packet is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain loop is running.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.lock().writing
    }

    fn drain(&self) {
        let _guard = DrainGuard(&self.inner);
        loop {
            let (entry, epoch) = {
                let mut inner = self.lock();
                let Some(entry) = inner.pending.pop_front() else {
                    inner.writing = false;
                    return;
                };
                (entry, self.epoch.load(Ordering::SeqCst))
            };

            match self.transmit(&entry, epoch) {
                Ok(()) => {
                    self.metrics
                        .record_packet(PacketDirection::Sent, entry.packet_type);
                    debug!(
                        packet_type = %entry.packet_type,
                        fragments = entry.frames.len(),
                        len = entry.len,
                        "packet sent"
                    );
                }
                Err(TransportError::LinkDown) => {
                    debug!(packet_type = %entry.packet_type, "transmission aborted by disconnect");
                }
                Err(err) => {
                    self.metrics.record_send_failure();
                    error!(error = %err, "dropping packet");
                }
            }
        }
    }

    fn transmit(&self, entry: &QueuedPacket, epoch: u64) -> Result<(), TransportError> {
        let last = entry.frames.len().saturating_sub(1);
        for (index, frame) in entry.frames.iter().enumerate() {
            let fragment = u8::try_from(index).unwrap_or(u8::MAX);
            self.write_frame(entry.packet_type, fragment, frame, epoch)?;
            self.metrics.record_frame(PacketDirection::Sent);
            if index < last {
                self.pause(self.config.pacing_delay, epoch)?;
            } else {
                sleep(self.config.pacing_delay);
            }
        }
        Ok(())
    }

    fn write_frame(
        &self,
        packet_type: PacketType,
        fragment: u8,
        frame: &[u8],
        epoch: u64,
    ) -> Result<(), TransportError> {
        let max_attempts = self.config.max_write_attempts.max(1);
        let mut attempts = 0;
        loop {
            self.ensure_epoch(epoch)?;
            attempts += 1;
            match self.link.write(frame) {
                Ok(()) => {
                    trace!(fragment, len = frame.len(), attempts, "frame written");
                    return Ok(());
                }
                Err(source) if attempts >= max_attempts => {
                    return Err(TransportError::SendFailed {
                        packet_type,
                        fragment,
                        attempts,
                        source,
                    });
                }
                Err(err) => {
                    warn!(fragment, attempts, error = %err, "frame write failed; retrying");
                    self.metrics.record_retry();
                    self.pause(self.config.retry_backoff, epoch)?;
                }
            }
        }
    }

    fn pause(&self, delay: Duration, epoch: u64) -> Result<(), TransportError> {
        sleep(delay);
        self.ensure_epoch(epoch)
    }

    fn ensure_epoch(&self, epoch: u64) -> Result<(), TransportError> {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            Ok(())
        } else {
            Err(TransportError::LinkDown)
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sleep(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
