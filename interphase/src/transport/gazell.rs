//! Nordic Gazell transport.
//!
//! Gazell ships as a prebuilt static library (`gzll_nrf52_gcc`) that the firmware links. This module
//! declares the parts of its C API a transmitting device needs and exports the callbacks the library
//! calls from the radio interrupt. Callbacks are forwarded to the handler registered with
//! [`register_event_handler`](super::register_event_handler).

use super::{
    ACK_PAYLOAD_MAX_LEN, RadioMode, RadioTransport, SendResult, TransportError, with_event_handler,
};
use crate::config::RadioConfig;

mod ffi {
    #![allow(non_camel_case_types)]

    pub type nrf_gzll_mode_t = u32;
    pub const NRF_GZLL_MODE_DEVICE: nrf_gzll_mode_t = 0;
    pub const NRF_GZLL_MODE_HOST: nrf_gzll_mode_t = 1;
    pub const NRF_GZLL_MODE_SUSPEND: nrf_gzll_mode_t = 2;

    pub type nrf_gzll_error_code_t = u32;
    pub const NRF_GZLL_ERROR_CODE_NO_ERROR: nrf_gzll_error_code_t = 0;

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct nrf_gzll_device_tx_info_t {
        pub payload_received_in_ack: bool,
        pub num_tx_attempts: u16,
        pub num_channel_switches: u16,
        pub rssi: i8,
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    pub struct nrf_gzll_host_rx_info_t {
        pub packet_received_in_ack: bool,
        pub rssi: i8,
    }

    unsafe extern "C" {
        pub fn nrf_gzll_init(mode: nrf_gzll_mode_t) -> bool;
        pub fn nrf_gzll_set_max_tx_attempts(max_tx_attempts: u16);
        pub fn nrf_gzll_set_base_address_0(base_address: u32) -> bool;
        pub fn nrf_gzll_set_base_address_1(base_address: u32) -> bool;
        pub fn nrf_gzll_enable() -> bool;
        pub fn nrf_gzll_add_packet_to_tx_fifo(pipe: u32, payload: *const u8, length: u32) -> bool;
        pub fn nrf_gzll_fetch_packet_from_rx_fifo(pipe: u32, payload: *mut u8, length: *mut u32) -> bool;
        pub fn nrf_gzll_get_tx_fifo_packet_count(pipe: u32) -> i32;
        pub fn nrf_gzll_get_error_code() -> nrf_gzll_error_code_t;
        pub fn nrf_gzll_reset_error_code();
    }
}

/// Depth of Gazell's per-pipe TX FIFO
const TX_FIFO_DEPTH: i32 = 3;

/// Gazell link in device mode.
///
/// The library is a global singleton, so this type carries no state beyond whether it was enabled.
pub struct GazellTransport {
    enabled: bool,
}

impl Default for GazellTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl GazellTransport {
    pub const fn new() -> Self {
        Self { enabled: false }
    }

    fn vendor_error() -> TransportError {
        // SAFETY: reading and clearing the error code has no preconditions
        let code = unsafe { ffi::nrf_gzll_get_error_code() };
        unsafe { ffi::nrf_gzll_reset_error_code() };
        if code == ffi::NRF_GZLL_ERROR_CODE_NO_ERROR {
            TransportError::TxFifoFull
        } else {
            TransportError::Vendor(code)
        }
    }
}

impl RadioTransport for GazellTransport {
    fn initialize(&mut self, mode: RadioMode) -> Result<(), TransportError> {
        let mode = match mode {
            RadioMode::Device => ffi::NRF_GZLL_MODE_DEVICE,
            RadioMode::Host => ffi::NRF_GZLL_MODE_HOST,
            RadioMode::Suspend => ffi::NRF_GZLL_MODE_SUSPEND,
        };
        // SAFETY: Gazell is initialized once, before it is enabled
        if unsafe { ffi::nrf_gzll_init(mode) } {
            Ok(())
        } else {
            error!("Gazell init failed: {:?}", Self::vendor_error());
            Err(TransportError::InitFailed)
        }
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<(), TransportError> {
        // SAFETY: configuration calls are only valid while Gazell is disabled, which `enabled` tracks
        let accepted = !self.enabled
            && unsafe {
                ffi::nrf_gzll_set_max_tx_attempts(config.max_tx_attempts);
                ffi::nrf_gzll_set_base_address_0(config.base_address_0)
                    && ffi::nrf_gzll_set_base_address_1(config.base_address_1)
            };
        if accepted {
            Ok(())
        } else {
            Err(TransportError::ConfigRejected)
        }
    }

    fn enable(&mut self) -> Result<(), TransportError> {
        // SAFETY: Gazell has been initialized by `initialize`
        if unsafe { ffi::nrf_gzll_enable() } {
            self.enabled = true;
            Ok(())
        } else {
            Err(TransportError::EnableFailed)
        }
    }

    fn send(&mut self, pipe: u8, payload: &[u8]) -> Result<(), TransportError> {
        if !self.enabled {
            return Err(TransportError::NotEnabled);
        }
        if payload.len() > ACK_PAYLOAD_MAX_LEN {
            return Err(TransportError::PayloadTooLong);
        }
        // SAFETY: the library copies `payload` into its FIFO before returning
        let queued = unsafe {
            ffi::nrf_gzll_get_tx_fifo_packet_count(pipe as u32) < TX_FIFO_DEPTH
                && ffi::nrf_gzll_add_packet_to_tx_fifo(pipe as u32, payload.as_ptr(), payload.len() as u32)
        };
        if queued { Ok(()) } else { Err(Self::vendor_error()) }
    }
}

/// Pop the acknowledgement payload of `pipe` so the RX FIFO never fills up
fn drain_ack(pipe: u32, buf: &mut [u8; ACK_PAYLOAD_MAX_LEN]) -> Option<usize> {
    let mut len = ACK_PAYLOAD_MAX_LEN as u32;
    // SAFETY: `buf` holds `len` bytes, the library writes at most `len` and updates it
    let fetched = unsafe { ffi::nrf_gzll_fetch_packet_from_rx_fifo(pipe, buf.as_mut_ptr(), &mut len) };
    fetched.then_some(len as usize)
}

#[unsafe(no_mangle)]
extern "C" fn nrf_gzll_device_tx_success(pipe: u32, tx_info: ffi::nrf_gzll_device_tx_info_t) {
    let mut ack = [0u8; ACK_PAYLOAD_MAX_LEN];
    let ack_len = if tx_info.payload_received_in_ack {
        drain_ack(pipe, &mut ack)
    } else {
        None
    };
    with_event_handler(|h| h.on_send_result(pipe as u8, SendResult::Delivered, ack_len.map(|n| &ack[..n])));
}

#[unsafe(no_mangle)]
extern "C" fn nrf_gzll_device_tx_failed(pipe: u32, tx_info: ffi::nrf_gzll_device_tx_info_t) {
    let mut ack = [0u8; ACK_PAYLOAD_MAX_LEN];
    let ack_len = if tx_info.payload_received_in_ack {
        drain_ack(pipe, &mut ack)
    } else {
        None
    };
    with_event_handler(|h| h.on_send_result(pipe as u8, SendResult::Failed, ack_len.map(|n| &ack[..n])));
}

#[unsafe(no_mangle)]
extern "C" fn nrf_gzll_host_rx_data_ready(pipe: u32, _rx_info: ffi::nrf_gzll_host_rx_info_t) {
    let mut buf = [0u8; ACK_PAYLOAD_MAX_LEN];
    if let Some(n) = drain_ack(pipe, &mut buf) {
        with_event_handler(|h| h.on_receive(pipe as u8, &buf[..n]));
    }
}

#[unsafe(no_mangle)]
extern "C" fn nrf_gzll_disabled() {}
