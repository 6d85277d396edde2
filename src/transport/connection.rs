//! Connection state machine tying the link, write queue and reassembler
//! together.
//!
//! ```text
//! Disconnected -> Connecting -> ServiceReady -> NotificationsEnabled -> Ready
//!       ^______________________________|_______________________________|
//!                          link lost / disconnect
//! ```

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::config::LinkConfig;
use super::error::TransportError;
use super::fragment::{Reassembler, ReassemblyPhase};
use super::frame::Frame;
use super::link::Link;
use super::queue::WriteQueue;
use crate::protocol::metrics::{Metrics, PacketDirection};
use crate::protocol::{MetricsSnapshot, Packet};

/// Lifecycle of the link to the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No link.
    Disconnected,
    /// Link requested, waiting for the service to resolve.
    Connecting,
    /// Packet service resolved on the peer.
    ServiceReady,
    /// Notifications enabled, settling before first use.
    NotificationsEnabled,
    /// Packets may flow both ways.
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::ServiceReady => "ServiceReady",
            Self::NotificationsEnabled => "NotificationsEnabled",
            Self::Ready => "Ready",
        };
        write!(f, "{name}")
    }
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link completed its handshake; collaborators should push state.
    Ready,
    /// The link went down and all transient state was dropped.
    Disconnected,
    /// A complete packet arrived from the peer.
    PacketReceived(Packet),
}

/// One peripheral session: owns the outbound queue, the inbound reassembler
/// and the subscriber list.
///
/// The platform layer forwards link callbacks to the `on_*` methods;
/// collaborators call [`send`](Self::send) and consume events from
/// [`subscribe`](Self::subscribe).
pub struct Connection<L: Link> {
    link: Arc<L>,
    config: LinkConfig,
    state: Mutex<ConnectionState>,
    queue: WriteQueue<L>,
    reassembler: Mutex<Reassembler>,
    subscribers: Mutex<Vec<Sender<LinkEvent>>>,
    metrics: Arc<Metrics>,
}

impl<L: Link> Connection<L> {
    /// Create a disconnected session over `link`.
    #[must_use]
    pub fn new(link: Arc<L>, config: LinkConfig) -> Self {
        let metrics = Arc::new(Metrics::default());
        let queue = WriteQueue::with_metrics(Arc::clone(&link), config.clone(), Arc::clone(&metrics));
        Self {
            link,
            config,
            state: Mutex::new(ConnectionState::Disconnected),
            queue,
            reassembler: Mutex::default(),
            subscribers: Mutex::default(),
            metrics,
        }
    }

    /// Register a subscriber. Dropping the receiver unsubscribes it.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<LinkEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Whether packets may be sent.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Underlying link.
    #[must_use]
    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Counter snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Packets waiting in the outbound queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether no inbound packet is partially assembled.
    #[must_use]
    pub fn reassembly_idle(&self) -> bool {
        lock(&self.reassembler).is_idle()
    }

    /// Progress of the inbound packet being assembled.
    #[must_use]
    pub fn reassembly_phase(&self) -> ReassemblyPhase {
        lock(&self.reassembler).phase()
    }

    /// Ask the link to open.
    ///
    /// Only acts from `Disconnected`; in any other state the current state is
    /// returned unchanged.
    #[instrument(level = "debug", skip(self))]
    pub fn connect(&self) -> Result<ConnectionState, TransportError> {
        {
            let mut state = lock(&self.state);
            if *state != ConnectionState::Disconnected {
                debug!(state = %*state, "connect ignored");
                return Ok(*state);
            }
            *state = ConnectionState::Connecting;
        }
        if let Err(err) = self.link.open() {
            error!(error = %err, "link open failed");
            *lock(&self.state) = ConnectionState::Disconnected;
            return Err(err.into());
        }
        debug!("connecting");
        Ok(ConnectionState::Connecting)
    }

    /// The link resolved a service on the peer.
    ///
    /// For the configured packet service this enables notifications, waits
    /// the settle delay and emits [`LinkEvent::Ready`]. Other services are
    /// ignored.
    #[instrument(level = "debug", skip(self))]
    pub fn on_service_resolved(&self, service: Uuid) -> Result<(), TransportError> {
        {
            let mut state = lock(&self.state);
            if *state != ConnectionState::Connecting {
                return Err(TransportError::InvalidState {
                    state: *state,
                    event: "service resolution",
                });
            }
            if service != self.config.profile.service {
                warn!(%service, expected = %self.config.profile.service, "ignoring unexpected service");
                return Ok(());
            }
            *state = ConnectionState::ServiceReady;
        }
        debug!("service ready; enabling notifications");

        if let Err(err) = self.link.enable_notifications(&self.config.profile) {
            error!(error = %err, characteristic = %self.config.profile.characteristic, "failed to enable notifications");
            return Err(err.into());
        }
        self.advance(ConnectionState::ServiceReady, ConnectionState::NotificationsEnabled)?;

        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }
        self.advance(ConnectionState::NotificationsEnabled, ConnectionState::Ready)?;

        info!("link ready");
        self.emit(&LinkEvent::Ready);
        Ok(())
    }

    /// The link reported loss of the peer.
    ///
    /// Drops queued packets, aborts the packet in flight, resets reassembly
    /// and emits [`LinkEvent::Disconnected`] unless already disconnected.
    #[instrument(level = "debug", skip(self))]
    pub fn on_link_lost(&self) {
        let (previous, dropped) = {
            let mut state = lock(&self.state);
            let previous = *state;
            *state = ConnectionState::Disconnected;
            (previous, self.queue.clear())
        };
        lock(&self.reassembler).reset();

        if previous == ConnectionState::Disconnected {
            return;
        }
        info!(%previous, dropped, "link down");
        self.emit(&LinkEvent::Disconnected);
    }

    /// Close the link on request of a collaborator.
    pub fn disconnect(&self) {
        self.link.close();
        self.on_link_lost();
    }

    /// End the session: disconnect and release every subscriber.
    ///
    /// Subscribers receive the final [`LinkEvent::Disconnected`], after which
    /// their channels close.
    pub fn close(&self) {
        self.disconnect();
        let released = std::mem::take(&mut *lock(&self.subscribers)).len();
        debug!(released, "session closed");
    }

    /// Queue a packet for the peer.
    ///
    /// Fails with [`TransportError::LinkDown`] unless the link is ready and
    /// with [`TransportError::PacketTooLarge`] before anything is written. A
    /// disconnect racing with this call either rejects the packet or discards
    /// it with the rest of the queue.
    /// May block the caller while it drains the queue.
    pub fn send(&self, packet: impl Into<Packet>) -> Result<(), TransportError> {
        let packet = packet.into();
        if !self.is_ready() {
            warn!(packet_type = %packet.packet_type(), "cannot send packet: link not ready");
            return Err(TransportError::LinkDown);
        }
        self.queue.enqueue(&packet)
    }

    /// Feed one inbound notification chunk.
    ///
    /// Returns the decoded packet when the chunk completed one; the packet is
    /// also emitted as [`LinkEvent::PacketReceived`]. Errors are logged and
    /// leave the reassembler in a consistent state.
    #[instrument(level = "trace", skip(self, chunk), fields(len = chunk.len()))]
    pub fn on_data(&self, chunk: &[u8]) -> Result<Option<Packet>, TransportError> {
        if self.state() == ConnectionState::Disconnected {
            debug!("dropping chunk received while disconnected");
            return Err(TransportError::LinkDown);
        }
        let result = self.accept_chunk(Bytes::copy_from_slice(chunk));
        match &result {
            Ok(Some(packet)) => {
                self.metrics
                    .record_packet(PacketDirection::Received, packet.packet_type());
                debug!(packet_type = %packet.packet_type(), "packet received");
                self.emit(&LinkEvent::PacketReceived(packet.clone()));
            }
            Ok(None) => {}
            Err(err) => {
                self.metrics.record_inbound_drop();
                warn!(error = %err, "dropping inbound data");
            }
        }
        result
    }

    fn accept_chunk(&self, chunk: Bytes) -> Result<Option<Packet>, TransportError> {
        let frame = Frame::decode(chunk)?;
        self.metrics.record_frame(PacketDirection::Received);
        let reassembled = lock(&self.reassembler).push(&frame)?;
        match reassembled {
            Some(done) => Ok(Some(Packet::decode(done.packet_type, done.payload)?)),
            None => Ok(None),
        }
    }

    fn advance(&self, from: ConnectionState, to: ConnectionState) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if *state != from {
            debug!(state = %*state, %to, "handshake interrupted");
            return Err(TransportError::LinkDown);
        }
        *state = to;
        // on_link_lost closes the queue under the same lock.
        if to == ConnectionState::Ready {
            self.queue.open();
        }
        debug!(%from, %to, "state transition");
        Ok(())
    }

    fn emit(&self, event: &LinkEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<L: Link> fmt::Debug for Connection<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
