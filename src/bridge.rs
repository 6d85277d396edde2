//! Glue between connection events and the host's media session.
//!
//! On [`LinkEvent::Ready`] the bridge pushes the local clock and the current
//! track to the peripheral; inbound [`MediaCommandPacket`]s are dispatched to
//! a [`PlaybackControl`].

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use tracing::{debug, info, instrument, warn};

use crate::protocol::{MediaCommand, MediaInfoPacket, Packet, TimeSyncPacket};
use crate::transport::{Connection, Link, LinkEvent, TransportError};

/// Track state reported by the host media session. Missing metadata stays
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSnapshot {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Album name.
    pub album: Option<String>,
    /// Track length in milliseconds, when known.
    pub duration_ms: Option<i64>,
    /// Playback position in milliseconds.
    pub position_ms: i64,
    /// Whether the session is playing.
    pub is_playing: bool,
}

impl MediaSnapshot {
    /// Build the wire packet, substituting `unknown` for missing text and
    /// `-1` for a missing duration.
    #[must_use]
    pub fn into_packet(self, unknown: &str) -> MediaInfoPacket {
        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| unknown.to_owned());
        MediaInfoPacket {
            title: or_unknown(self.title),
            artist: or_unknown(self.artist),
            album: or_unknown(self.album),
            duration: self.duration_ms.unwrap_or(-1),
            position: self.position_ms,
            is_playing: self.is_playing,
        }
    }
}

/// Source of the current track; `None` when no media session is active.
pub trait MediaSource: Send + Sync {
    /// Current track state.
    fn snapshot(&self) -> Option<MediaSnapshot>;
}

/// Transport controls of the host media session.
pub trait PlaybackControl: Send + Sync {
    /// Toggle between play and pause.
    fn toggle_play_pause(&self);
    /// Skip to the next track.
    fn next(&self);
    /// Skip to the previous track.
    fn previous(&self);
}

impl<T: MediaSource + ?Sized> MediaSource for Arc<T> {
    fn snapshot(&self) -> Option<MediaSnapshot> {
        (**self).snapshot()
    }
}

impl<T: PlaybackControl + ?Sized> PlaybackControl for Arc<T> {
    fn toggle_play_pause(&self) {
        (**self).toggle_play_pause();
    }

    fn next(&self) {
        (**self).next();
    }

    fn previous(&self) {
        (**self).previous();
    }
}

/// Bridge behaviour.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BridgeConfig {
    /// Text sent for missing title, artist or album.
    pub unknown_text: String,
    /// Send a time sync when the link becomes ready.
    pub sync_time_on_ready: bool,
    /// Send the current track when the link becomes ready.
    pub push_media_on_ready: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            unknown_text: "Unknown".to_owned(),
            sync_time_on_ready: true,
            push_media_on_ready: true,
        }
    }
}

/// Media session collaborator of a [`Connection`].
pub struct MediaBridge<L: Link, M, P> {
    connection: Arc<Connection<L>>,
    media: M,
    playback: P,
    config: BridgeConfig,
}

impl<L, M, P> MediaBridge<L, M, P>
where
    L: Link,
    M: MediaSource,
    P: PlaybackControl,
{
    /// Create a bridge for `connection`.
    #[must_use]
    pub fn new(connection: Arc<Connection<L>>, media: M, playback: P, config: BridgeConfig) -> Self {
        Self {
            connection,
            media,
            playback,
            config,
        }
    }

    /// Connection this bridge talks to.
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection<L>> {
        &self.connection
    }

    /// React to one connection event.
    #[instrument(level = "debug", skip(self))]
    pub fn handle_event(&self, event: &LinkEvent) -> Result<(), TransportError> {
        match event {
            LinkEvent::Ready => {
                if self.config.sync_time_on_ready {
                    self.sync_time()?;
                }
                if self.config.push_media_on_ready {
                    self.notify_media_changed()?;
                }
                Ok(())
            }
            LinkEvent::Disconnected => {
                debug!("peripheral gone");
                Ok(())
            }
            LinkEvent::PacketReceived(Packet::MediaCommand(packet)) => {
                self.dispatch(packet.command());
                Ok(())
            }
            LinkEvent::PacketReceived(other) => {
                debug!(packet_type = %other.packet_type(), "ignoring packet");
                Ok(())
            }
        }
    }

    /// Handle events until the channel closes, which happens once the
    /// connection is closed with [`Connection::close`] or dropped.
    ///
    /// Failures are logged; the loop keeps going.
    pub fn run(&self, events: &Receiver<LinkEvent>) {
        for event in events {
            if let Err(err) = self.handle_event(&event) {
                warn!(error = %err, ?event, "bridge failed to handle event");
            }
        }
        debug!("event channel closed");
    }

    /// Push the current track. Does nothing without an active media session.
    pub fn notify_media_changed(&self) -> Result<(), TransportError> {
        let Some(snapshot) = self.media.snapshot() else {
            debug!("no active media session");
            return Ok(());
        };
        self.connection
            .send(snapshot.into_packet(&self.config.unknown_text))
    }

    /// Push the local clock.
    pub fn sync_time(&self) -> Result<(), TransportError> {
        let packet = TimeSyncPacket::now_local();
        debug!(timestamp = packet.timestamp_millis(), "syncing time");
        self.connection.send(packet)
    }

    fn dispatch(&self, command: MediaCommand) {
        info!(%command, "media command");
        match command {
            MediaCommand::TogglePlayPause => self.playback.toggle_play_pause(),
            MediaCommand::Next => self.playback.next(),
            MediaCommand::Previous => self.playback.previous(),
        }
    }
}
