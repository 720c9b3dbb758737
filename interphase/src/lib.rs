//! Firmware core of an Interphase wireless keyboard half.
//!
//! A half scans its key matrix into a [`KeySnapshot`](matrix::KeySnapshot), copies the snapshot into a
//! [`WirelessPayload`](payload::WirelessPayload) and pushes it to a [`RadioTransport`](transport::RadioTransport).
//! When the payload is transmitted is decided by a [`SchedulePolicy`](scheduler::SchedulePolicy):
//! either on every scan, or on a fixed maintenance tick that re-sends the full state so the receiver
//! recovers from any lost frame.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod half;
pub mod matrix;
pub mod payload;
pub mod scheduler;
pub mod transport;

pub use config::{RadioConfig, ScheduleConfig, Side, BUILD_SIDE};
pub use half::{Trigger, WirelessHalf};
pub use matrix::{KeySnapshot, MatrixScanner};
pub use payload::{WirelessPayload, assemble};
pub use scheduler::{Continuous, Periodic, SchedulePolicy, TransmitDecision, TransmitScheduler};
pub use transport::{
    LinkMonitor, RadioMode, RadioTransport, SendResult, TransportError, TransportEventHandler, bring_up,
    register_event_handler,
};

/// Mutex type used by the statics shared with interrupt context
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

include!(concat!(env!("OUT_DIR"), "/constants.rs"));
