//! Transmit scheduling.
//!
//! [`TransmitScheduler`] owns the outbound [`WirelessPayload`] and the radio. It is told about two kinds
//! of events, a completed matrix scan and a maintenance tick, and asks its [`SchedulePolicy`] whether
//! each one should put the current snapshot on air.
//!
//! Two policies are provided:
//! - [`Continuous`]: every scan is transmitted, there are no maintenance ticks.
//! - [`Periodic`]: scans only refresh the snapshot, the radio is driven from the maintenance tick alone.
//!   A key pressed and released entirely between two ticks is never seen by the receiver.

use embassy_time::{Duration, Instant};

use crate::config::ScheduleConfig;
use crate::matrix::KeySnapshot;
use crate::payload::WirelessPayload;
use crate::transport::RadioTransport;

/// What to do with the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitDecision {
    Transmit,
    Hold,
}

/// Decides when the scheduler transmits.
pub trait SchedulePolicy {
    /// Period of the maintenance tick, `None` if the policy doesn't use one
    fn maintenance_period(&self) -> Option<Duration>;

    /// True if scans run back to back instead of waiting for a key to change
    fn free_running(&self) -> bool;

    /// A scan finished at `now`
    fn on_scan_complete(&mut self, now: Instant) -> TransmitDecision;

    /// A maintenance tick fired at `now`
    fn on_maintenance_tick(&mut self, now: Instant) -> TransmitDecision;
}

/// Scan, assemble and send back to back.
///
/// `min_interval` spaces transmissions out; with the default of zero every scan is sent, bounded only
/// by how fast the loop and the radio go.
#[derive(Debug, Clone, Copy)]
pub struct Continuous {
    min_interval: Duration,
    last_transmit: Option<Instant>,
}

impl Default for Continuous {
    fn default() -> Self {
        Self::new(ScheduleConfig::default().continuous_min_interval)
    }
}

impl Continuous {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_transmit: None,
        }
    }

    /// No rate limit at all
    pub const fn unlimited() -> Self {
        Self::new(Duration::from_ticks(0))
    }
}

impl SchedulePolicy for Continuous {
    fn maintenance_period(&self) -> Option<Duration> {
        None
    }

    fn free_running(&self) -> bool {
        true
    }

    fn on_scan_complete(&mut self, now: Instant) -> TransmitDecision {
        if let Some(last) = self.last_transmit {
            if now.checked_duration_since(last).is_some_and(|d| d < self.min_interval) {
                return TransmitDecision::Hold;
            }
        }
        self.last_transmit = Some(now);
        TransmitDecision::Transmit
    }

    fn on_maintenance_tick(&mut self, _now: Instant) -> TransmitDecision {
        TransmitDecision::Hold
    }
}

/// Transmit the last known state on a fixed tick, whether it changed or not.
///
/// Every frame is a full snapshot, so after any lost frame the receiver is correct again one period
/// later.
#[derive(Debug, Clone, Copy)]
pub struct Periodic {
    period: Duration,
}

impl Default for Periodic {
    fn default() -> Self {
        Self::new(ScheduleConfig::default().maintenance_period)
    }
}

impl Periodic {
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    pub const fn from_hz(hz: u64) -> Self {
        Self::new(Duration::from_hz(hz))
    }
}

impl SchedulePolicy for Periodic {
    fn maintenance_period(&self) -> Option<Duration> {
        Some(self.period)
    }

    fn free_running(&self) -> bool {
        false
    }

    fn on_scan_complete(&mut self, _now: Instant) -> TransmitDecision {
        TransmitDecision::Hold
    }

    fn on_maintenance_tick(&mut self, _now: Instant) -> TransmitDecision {
        TransmitDecision::Transmit
    }
}

/// Owner of the outbound payload buffer and the radio.
pub struct TransmitScheduler<T: RadioTransport, P: SchedulePolicy, const ROW: usize> {
    transport: T,
    policy: P,
    /// Only written right before a transmission
    payload: WirelessPayload<ROW>,
    pipe: u8,
}

impl<T: RadioTransport, P: SchedulePolicy, const ROW: usize> TransmitScheduler<T, P, ROW> {
    /// Create a scheduler sending on `pipe`. The transport is expected to be enabled already.
    pub fn new(transport: T, policy: P, pipe: u8) -> Self {
        Self {
            transport,
            policy,
            payload: WirelessPayload::new(),
            pipe,
        }
    }

    /// A scan completed, `snapshot` is its result
    pub fn on_scan_complete(&mut self, snapshot: &KeySnapshot<ROW>, now: Instant) -> TransmitDecision {
        let decision = self.policy.on_scan_complete(now);
        self.apply(decision, snapshot);
        decision
    }

    /// A maintenance tick fired, `snapshot` is the latest known key state
    pub fn on_maintenance_tick(&mut self, snapshot: &KeySnapshot<ROW>, now: Instant) -> TransmitDecision {
        let decision = self.policy.on_maintenance_tick(now);
        self.apply(decision, snapshot);
        decision
    }

    fn apply(&mut self, decision: TransmitDecision, snapshot: &KeySnapshot<ROW>) {
        if decision == TransmitDecision::Transmit {
            self.payload.fill_from(snapshot);
            self.transmit();
        }
    }

    /// Hand the payload to the radio. A refused frame is dropped, the next transmission carries the
    /// full state anyway.
    fn transmit(&mut self) {
        if let Err(e) = self.transport.send(self.pipe, self.payload.as_bytes()) {
            debug!("Frame not queued, dropping it: {:?}", e);
        }
    }

    /// Payload of the latest transmission
    pub fn payload(&self) -> &WirelessPayload<ROW> {
        &self.payload
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn pipe(&self) -> u8 {
        self.pipe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_without_limit_transmits_every_scan() {
        let mut policy = Continuous::unlimited();
        let t = Instant::from_millis(10);
        assert_eq!(policy.on_scan_complete(t), TransmitDecision::Transmit);
        assert_eq!(policy.on_scan_complete(t), TransmitDecision::Transmit);
        assert_eq!(policy.on_maintenance_tick(t), TransmitDecision::Hold);
        assert_eq!(policy.maintenance_period(), None);
        assert!(policy.free_running());
    }

    #[test]
    fn continuous_respects_min_interval() {
        let mut policy = Continuous::new(Duration::from_millis(5));
        assert_eq!(policy.on_scan_complete(Instant::from_millis(100)), TransmitDecision::Transmit);
        assert_eq!(policy.on_scan_complete(Instant::from_millis(103)), TransmitDecision::Hold);
        assert_eq!(policy.on_scan_complete(Instant::from_millis(105)), TransmitDecision::Transmit);
        assert_eq!(policy.on_scan_complete(Instant::from_millis(106)), TransmitDecision::Hold);
    }

    #[test]
    fn periodic_only_transmits_on_tick() {
        let mut policy = Periodic::from_hz(8);
        let t = Instant::from_millis(0);
        assert_eq!(policy.on_scan_complete(t), TransmitDecision::Hold);
        assert_eq!(policy.on_maintenance_tick(t), TransmitDecision::Transmit);
        assert_eq!(policy.maintenance_period(), Some(Duration::from_millis(125)));
        assert!(!policy.free_running());
    }
}
