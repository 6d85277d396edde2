//! Boundary to the platform BLE stack.

use thiserror::Error;

use super::config::GattProfile;
use super::frame::DEFAULT_MAX_WRITE_LEN;

/// Failure reported by the link collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The stack refused or failed a characteristic write.
    #[error("write rejected: {0}")]
    WriteRejected(String),
    /// No peer is attached.
    #[error("not connected")]
    NotConnected,
    /// Expected characteristic or descriptor is missing on the peer.
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),
    /// Any other platform failure.
    #[error("{0}")]
    Other(String),
}

/// Connection-oriented channel to one peripheral.
///
/// Implementations wrap the platform GATT client. Inbound notifications are
/// delivered by the implementation calling [`Connection::on_data`] and link
/// transitions by calling the other `on_*` hooks.
///
/// [`Connection::on_data`]: super::Connection::on_data
pub trait Link: Send + Sync {
    /// Perform one atomic write of at most [`max_write_len`](Self::max_write_len)
    /// bytes, blocking until the stack accepts or rejects it.
    fn write(&self, frame: &[u8]) -> Result<(), LinkError>;

    /// Largest single write the peer negotiated.
    ///
    /// Must exceed the 2-byte frame header; smaller values make every send
    /// fail with [`TransportError::WriteLenTooSmall`].
    ///
    /// [`TransportError::WriteLenTooSmall`]: super::TransportError::WriteLenTooSmall
    fn max_write_len(&self) -> usize {
        DEFAULT_MAX_WRITE_LEN
    }

    /// Start opening the link; completion arrives as a service resolution.
    fn open(&self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Close the link.
    fn close(&self) {}

    /// Subscribe to notifications on the profile's characteristic.
    fn enable_notifications(&self, profile: &GattProfile) -> Result<(), LinkError>;
}
