//! The abstracted radio layer of a keyboard half.
//!
//! The radio stack (addressing, channel hopping, link-layer retransmission, acknowledgements) is a
//! black box behind [`RadioTransport`]. Results of each transmission come back asynchronously, usually
//! from the radio interrupt, through a registered [`TransportEventHandler`].
//!
//! A frame that still fails after the transport's retry budget is dropped. Nothing is retried by the
//! core and nothing reaches the scanner: the next scheduled transmission carries the full key state
//! again.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;

use crate::RawMutex;
use crate::config::RadioConfig;

#[cfg(all(feature = "gazell", target_os = "none"))]
pub mod gazell;
pub mod sim;

/// Largest payload the radio carries in either direction, including acknowledgement payloads
pub const ACK_PAYLOAD_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The radio stack refused to initialize
    InitFailed,
    /// A configuration value was rejected
    ConfigRejected,
    /// The radio could not be enabled
    EnableFailed,
    /// `send` was called before `enable`
    NotEnabled,
    /// Payload longer than the radio supports
    PayloadTooLong,
    /// The transmit queue is full
    TxFifoFull,
    /// Vendor specific error code
    Vendor(u32),
}

/// Role of the radio on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    /// Transmitter, the role of a keyboard half
    Device,
    /// Receiver, the role of the dongle
    Host,
    /// Radio kept idle
    Suspend,
}

/// Final outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendResult {
    Delivered,
    /// Retry budget exhausted
    Failed,
}

/// Packet transport to the receiver
pub trait RadioTransport {
    fn initialize(&mut self, mode: RadioMode) -> Result<(), TransportError>;

    /// Apply retry budget and addressing
    fn configure(&mut self, config: &RadioConfig) -> Result<(), TransportError>;

    fn enable(&mut self) -> Result<(), TransportError>;

    /// Enqueue `payload` for transmission on `pipe`.
    ///
    /// `Ok` only means the frame was accepted; delivery is reported later through
    /// [`TransportEventHandler::on_send_result`].
    fn send(&mut self, pipe: u8, payload: &[u8]) -> Result<(), TransportError>;
}

impl<T: RadioTransport + ?Sized> RadioTransport for &mut T {
    fn initialize(&mut self, mode: RadioMode) -> Result<(), TransportError> {
        (**self).initialize(mode)
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<(), TransportError> {
        (**self).configure(config)
    }

    fn enable(&mut self) -> Result<(), TransportError> {
        (**self).enable()
    }

    fn send(&mut self, pipe: u8, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send(pipe, payload)
    }
}

/// Callbacks invoked by the transport, possibly from interrupt context.
pub trait TransportEventHandler: Sync {
    /// A frame was delivered or given up on. `ack` holds the acknowledgement payload drained from the
    /// transport, if the receiver attached one.
    fn on_send_result(&self, pipe: u8, result: SendResult, ack: Option<&[u8]>);

    /// A frame arrived from the receiver outside of an acknowledgement
    fn on_receive(&self, pipe: u8, payload: &[u8]);
}

/// Handler that vendor callbacks dispatch to
static EVENT_HANDLER: Mutex<RawMutex, Cell<Option<&'static dyn TransportEventHandler>>> =
    Mutex::new(Cell::new(None));

/// Register the handler receiving transport callbacks, replacing the previous one.
pub fn register_event_handler(handler: &'static dyn TransportEventHandler) {
    EVENT_HANDLER.lock(|h| h.set(Some(handler)));
}

/// Run `f` with the registered handler. Callbacks arriving before registration are discarded.
///
/// Transport glue calls this from its vendor callbacks.
pub fn with_event_handler(f: impl FnOnce(&dyn TransportEventHandler)) {
    if let Some(handler) = EVENT_HANDLER.lock(|h| h.get()) {
        f(handler);
    }
}

/// Bring the radio up as a transmitting device: initialize, configure, then enable.
pub fn bring_up<T: RadioTransport>(transport: &mut T, config: &RadioConfig) -> Result<(), TransportError> {
    transport.initialize(RadioMode::Device)?;
    debug!("Radio initialized as device");
    transport.configure(config)?;
    debug!(
        "Radio configured: {} attempts, pipe {}",
        config.max_tx_attempts, config.pipe
    );
    transport.enable()?;
    info!("Radio enabled");
    Ok(())
}

/// The core's transport handler.
///
/// Failed frames are only counted, acknowledgement payloads are drained and discarded, received
/// frames are ignored.
pub struct LinkMonitor {
    delivered: AtomicU32,
    dropped: AtomicU32,
    acks: AtomicU32,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            acks: AtomicU32::new(0),
        }
    }

    /// Frames confirmed by the receiver
    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames given up on after the retry budget
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Acknowledgement payloads drained
    pub fn acks(&self) -> u32 {
        self.acks.load(Ordering::Relaxed)
    }
}

impl TransportEventHandler for LinkMonitor {
    fn on_send_result(&self, pipe: u8, result: SendResult, ack: Option<&[u8]>) {
        match result {
            SendResult::Delivered => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                trace!("Frame delivered on pipe {}", pipe);
            }
            SendResult::Failed => {
                // The next refresh re-sends the full state
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Frame dropped on pipe {}", pipe);
            }
        }
        if ack.is_some() {
            self.acks.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_receive(&self, _pipe: u8, _payload: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_monitor_counts_results() {
        let monitor = LinkMonitor::new();
        monitor.on_send_result(0, SendResult::Delivered, None);
        monitor.on_send_result(0, SendResult::Delivered, Some(&[0xAA]));
        monitor.on_send_result(0, SendResult::Failed, None);
        monitor.on_receive(0, &[1, 2, 3]);
        assert_eq!(monitor.delivered(), 2);
        assert_eq!(monitor.dropped(), 1);
        assert_eq!(monitor.acks(), 1);
    }

    #[test]
    fn registered_handler_receives_callbacks() {
        static MONITOR: LinkMonitor = LinkMonitor::new();
        register_event_handler(&MONITOR);
        with_event_handler(|h| h.on_send_result(1, SendResult::Failed, None));
        assert_eq!(MONITOR.dropped(), 1);
    }
}
