//! Build-time configuration of a keyboard half.
//!
//! Constants come from `keyboard.toml` (see `KEYBOARD_TOML_PATH` in the build script), the side of the
//! keyboard comes from the `left`/`right` features.

use embassy_time::Duration;

use crate::{
    BASE_ADDRESS_0, BASE_ADDRESS_1, CONTINUOUS_MIN_INTERVAL_US, LEFT_PIPE, MAINTENANCE_HZ, MAX_TX_ATTEMPTS,
    POLL_INTERVAL_MS, RIGHT_PIPE,
};

#[cfg(all(feature = "left", feature = "right"))]
compile_error!("Can't compile as both right and left");

/// Physical half of the split keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Radio pipe this half transmits on.
    pub const fn pipe(self) -> u8 {
        match self {
            Side::Left => LEFT_PIPE,
            Side::Right => RIGHT_PIPE,
        }
    }
}

/// The half this firmware is built for
#[cfg(not(feature = "right"))]
pub const BUILD_SIDE: Side = Side::Left;
/// The half this firmware is built for
#[cfg(feature = "right")]
pub const BUILD_SIDE: Side = Side::Right;

/// Radio link parameters handed to [`RadioTransport::configure`](crate::transport::RadioTransport::configure).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    /// Attempts per frame before the transport gives up on it
    pub max_tx_attempts: u16,
    /// Primary base address
    pub base_address_0: u32,
    /// Secondary base address
    pub base_address_1: u32,
    /// Pipe used for key state frames
    pub pipe: u8,
}

impl RadioConfig {
    pub const fn for_side(side: Side) -> Self {
        Self {
            max_tx_attempts: MAX_TX_ATTEMPTS,
            base_address_0: BASE_ADDRESS_0,
            base_address_1: BASE_ADDRESS_1,
            pipe: side.pipe(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::for_side(BUILD_SIDE)
    }
}

/// Timing of the transmit scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleConfig {
    /// Period of the maintenance tick re-sending the full key state
    pub maintenance_period: Duration,
    /// Minimum spacing between continuous transmissions, zero disables the limit
    pub continuous_min_interval: Duration,
    /// Matrix polling interval used when no pin-sense interrupt is available
    pub poll_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            maintenance_period: Duration::from_hz(MAINTENANCE_HZ as u64),
            continuous_min_interval: Duration::from_micros(CONTINUOUS_MIN_INTERVAL_US),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_radio_config_matches_interphase_link() {
        let config = RadioConfig::for_side(Side::Left);
        assert_eq!(config.max_tx_attempts, 100);
        assert_eq!(config.base_address_0, 0x0102_0304);
        assert_eq!(config.base_address_1, 0x0506_0708);
        assert_eq!(config.pipe, 0);
        assert_eq!(RadioConfig::for_side(Side::Right).pipe, 1);
    }

    #[test]
    fn default_maintenance_tick_is_8hz() {
        let config = ScheduleConfig::default();
        assert_eq!(config.maintenance_period, Duration::from_millis(125));
        assert_eq!(config.continuous_min_interval, Duration::from_ticks(0));
    }
}
