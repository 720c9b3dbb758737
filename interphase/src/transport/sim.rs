//! Simulated radio link.
//!
//! [`SimulatedTransport`] stands in for the radio when running on a host. It keeps a log of every
//! frame offered to it, models the receiver as "last frame delivered" and lets a caller inject
//! delivery failures and acknowledgement payloads. Results are reported synchronously to the
//! handler given at construction.

use heapless::{Deque, Vec};

use super::{
    ACK_PAYLOAD_MAX_LEN, RadioMode, RadioTransport, SendResult, TransportError, TransportEventHandler,
};
use crate::config::RadioConfig;

/// Number of offered frames kept in the log
pub const SIM_LOG_DEPTH: usize = 64;

/// One frame as seen by the simulated link
pub type SimFrame = Vec<u8, ACK_PAYLOAD_MAX_LEN>;

/// A frame offered to the link and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub pipe: u8,
    pub bytes: SimFrame,
    pub result: SendResult,
}

pub struct SimulatedTransport<'a> {
    handler: Option<&'a dyn TransportEventHandler>,
    mode: Option<RadioMode>,
    config: Option<RadioConfig>,
    enabled: bool,
    /// Consecutive frames still to fail
    failures: u32,
    /// Acknowledgement attached to the next delivered frame
    pending_ack: Option<SimFrame>,
    log: Deque<SentFrame, SIM_LOG_DEPTH>,
    /// What the receiver currently holds
    received: Option<SimFrame>,
}

impl Default for SimulatedTransport<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SimulatedTransport<'a> {
    pub fn new() -> Self {
        Self {
            handler: None,
            mode: None,
            config: None,
            enabled: false,
            failures: 0,
            pending_ack: None,
            log: Deque::new(),
            received: None,
        }
    }

    /// Simulated link reporting results to `handler`
    pub fn with_handler(handler: &'a dyn TransportEventHandler) -> Self {
        Self {
            handler: Some(handler),
            ..Self::new()
        }
    }

    /// Make the next `count` frames fail after exhausting their retries
    pub fn fail_next(&mut self, count: u32) {
        self.failures = count;
    }

    /// Attach `ack` to the next delivered frame. Longer payloads are truncated.
    pub fn queue_ack(&mut self, ack: &[u8]) {
        let len = ack.len().min(ACK_PAYLOAD_MAX_LEN);
        self.pending_ack = Vec::from_slice(&ack[..len]).ok();
    }

    pub fn mode(&self) -> Option<RadioMode> {
        self.mode
    }

    pub fn config(&self) -> Option<&RadioConfig> {
        self.config.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Frames offered to the link, oldest first
    pub fn sent(&self) -> impl Iterator<Item = &SentFrame> {
        self.log.iter()
    }

    /// Most recent frame offered to the link
    pub fn last_sent(&self) -> Option<&SentFrame> {
        self.log.back()
    }

    pub fn sent_count(&self) -> usize {
        self.log.len()
    }

    /// Key state the receiver reconstructs from the frames it got
    pub fn received(&self) -> Option<&[u8]> {
        self.received.as_deref()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn record(&mut self, frame: SentFrame) {
        if self.log.is_full() {
            self.log.pop_front();
        }
        // Room was made above
        let _ = self.log.push_back(frame);
    }
}

impl RadioTransport for SimulatedTransport<'_> {
    fn initialize(&mut self, mode: RadioMode) -> Result<(), TransportError> {
        self.mode = Some(mode);
        Ok(())
    }

    fn configure(&mut self, config: &RadioConfig) -> Result<(), TransportError> {
        if self.enabled || config.max_tx_attempts == 0 || config.pipe > 7 {
            return Err(TransportError::ConfigRejected);
        }
        self.config = Some(*config);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), TransportError> {
        if self.mode.is_none() {
            return Err(TransportError::EnableFailed);
        }
        self.enabled = true;
        Ok(())
    }

    fn send(&mut self, pipe: u8, payload: &[u8]) -> Result<(), TransportError> {
        if !self.enabled {
            return Err(TransportError::NotEnabled);
        }
        let bytes = SimFrame::from_slice(payload).map_err(|_| TransportError::PayloadTooLong)?;

        let result = if self.failures > 0 {
            self.failures -= 1;
            SendResult::Failed
        } else {
            self.received = Some(bytes.clone());
            SendResult::Delivered
        };
        let ack = match result {
            SendResult::Delivered => self.pending_ack.take(),
            SendResult::Failed => None,
        };

        self.record(SentFrame { pipe, bytes, result });
        if let Some(handler) = self.handler {
            handler.on_send_result(pipe, result, ack.as_deref());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Side;
    use crate::transport::{LinkMonitor, bring_up};

    #[test]
    fn send_requires_enable() {
        let mut sim = SimulatedTransport::new();
        assert_eq!(sim.send(0, &[1]), Err(TransportError::NotEnabled));
        bring_up(&mut sim, &RadioConfig::for_side(Side::Left)).unwrap();
        assert_eq!(sim.mode(), Some(RadioMode::Device));
        assert!(sim.send(0, &[1]).is_ok());
    }

    #[test]
    fn failed_frame_keeps_previous_receiver_state() {
        let monitor = LinkMonitor::new();
        let mut sim = SimulatedTransport::with_handler(&monitor);
        bring_up(&mut sim, &RadioConfig::default()).unwrap();

        sim.send(0, &[1, 2]).unwrap();
        sim.fail_next(1);
        sim.send(0, &[3, 4]).unwrap();
        assert_eq!(sim.received(), Some(&[1u8, 2][..]));
        assert_eq!(sim.last_sent().unwrap().result, SendResult::Failed);
        assert_eq!(monitor.delivered(), 1);
        assert_eq!(monitor.dropped(), 1);
    }

    #[test]
    fn ack_is_handed_to_handler_once() {
        let monitor = LinkMonitor::new();
        let mut sim = SimulatedTransport::with_handler(&monitor);
        bring_up(&mut sim, &RadioConfig::default()).unwrap();

        sim.queue_ack(&[0xAB; 40]);
        sim.send(0, &[0]).unwrap();
        sim.send(0, &[0]).unwrap();
        assert_eq!(monitor.acks(), 1);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut sim = SimulatedTransport::new();
        bring_up(&mut sim, &RadioConfig::default()).unwrap();
        assert_eq!(sim.send(0, &[0; 33]), Err(TransportError::PayloadTooLong));
        assert_eq!(sim.sent_count(), 0);
    }
}
