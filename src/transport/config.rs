//! Link policy configuration.

use std::time::Duration;

use uuid::Uuid;

use super::frame::MAX_FRAME_PAYLOAD;

/// GATT identifiers of the peripheral's packet channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GattProfile {
    /// Primary service exposing the packet characteristic.
    pub service: Uuid,
    /// Characteristic written to and notified from.
    pub characteristic: Uuid,
    /// Client characteristic configuration descriptor.
    pub cccd: Uuid,
}

impl GattProfile {
    /// Service UUID advertised by the peripheral firmware.
    pub const SERVICE: Uuid = Uuid::from_u128(0x0b60_ab11_bc40_4d00_9ea4_5f24_0687_2d9f);
    /// Packet characteristic UUID.
    pub const CHARACTERISTIC: Uuid = Uuid::from_u128(0xcfa9_3afb_2c3d_4a76_a182_67e8_b6d5_0b55);
    /// Standard CCCD UUID.
    pub const CCCD: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5f9b_34fb);
}

impl Default for GattProfile {
    fn default() -> Self {
        Self {
            service: Self::SERVICE,
            characteristic: Self::CHARACTERISTIC,
            cccd: Self::CCCD,
        }
    }
}

/// Transport policy options.
///
/// The delays are empirical values that keep the peripheral from dropping
/// writes; they are not part of the wire protocol.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Upper bound on frame payload bytes; the link's write size may lower it.
    pub max_frame_payload: usize,
    /// Attempts per frame before the packet is dropped.
    pub max_write_attempts: u32,
    /// Pause between attempts of a failed frame write.
    pub retry_backoff: Duration,
    /// Pause after every successful frame write.
    pub pacing_delay: Duration,
    /// Pause between enabling notifications and reporting ready.
    pub settle_delay: Duration,
    /// Peripheral GATT identifiers.
    pub profile: GattProfile,
}

impl LinkConfig {
    /// Same policy with every delay removed.
    #[must_use]
    pub fn without_delays(self) -> Self {
        Self {
            retry_backoff: Duration::ZERO,
            pacing_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            ..self
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_frame_payload: MAX_FRAME_PAYLOAD,
            max_write_attempts: 5,
            retry_backoff: Duration::from_millis(30),
            pacing_delay: Duration::from_millis(200),
            settle_delay: Duration::from_millis(100),
            profile: GattProfile::default(),
        }
    }
}
