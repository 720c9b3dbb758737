//! One wireless keyboard half: a matrix scanner feeding a transmit scheduler.

use embassy_futures::select::{Either, select};
use embassy_futures::yield_now;
use embassy_time::{Duration, Instant, Ticker};
#[cfg(not(feature = "async_matrix"))]
use embassy_time::Timer;
use embedded_hal::delay::DelayNs;

use crate::config::ScheduleConfig;
use crate::matrix::{ActiveIn, ActiveOut, KeySnapshot, MatrixScanner};
use crate::scheduler::{SchedulePolicy, TransmitDecision, TransmitScheduler};
use crate::transport::RadioTransport;

/// Event that wakes the main loop of a half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// The matrix should be scanned: a key changed, the poll interval elapsed, or the loop is free
    /// running
    Scan,
    /// The maintenance tick fired
    Maintenance,
}

/// A keyboard half: scans its matrix and pushes the key state to the receiver.
pub struct WirelessHalf<
    In: ActiveIn<COL2ROW>,
    Out: ActiveOut<COL2ROW>,
    D: DelayNs,
    T: RadioTransport,
    P: SchedulePolicy,
    const ROW: usize,
    const COL: usize,
    const COL2ROW: bool,
> {
    matrix: MatrixScanner<In, Out, D, ROW, COL, COL2ROW>,
    scheduler: TransmitScheduler<T, P, ROW>,
    /// Used only when the matrix can't wait for a key edge
    #[cfg_attr(feature = "async_matrix", allow(unused))]
    poll_interval: Duration,
}

impl<
    In: ActiveIn<COL2ROW>,
    Out: ActiveOut<COL2ROW>,
    D: DelayNs,
    T: RadioTransport,
    P: SchedulePolicy,
    const ROW: usize,
    const COL: usize,
    const COL2ROW: bool,
> WirelessHalf<In, Out, D, T, P, ROW, COL, COL2ROW>
{
    pub fn new(matrix: MatrixScanner<In, Out, D, ROW, COL, COL2ROW>, scheduler: TransmitScheduler<T, P, ROW>) -> Self {
        Self {
            matrix,
            scheduler,
            poll_interval: ScheduleConfig::default().poll_interval,
        }
    }

    /// Override the polling interval used without `async_matrix`
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Process one trigger.
    ///
    /// A scan refreshes the snapshot and offers it to the scheduler. A maintenance tick hands the
    /// scheduler the snapshot as it stands, then rescans.
    pub fn handle(&mut self, trigger: Trigger, now: Instant) -> TransmitDecision {
        match trigger {
            Trigger::Scan => {
                let snapshot = self.matrix.scan();
                self.scheduler.on_scan_complete(snapshot, now)
            }
            Trigger::Maintenance => {
                let decision = self.scheduler.on_maintenance_tick(self.matrix.snapshot(), now);
                self.matrix.scan();
                decision
            }
        }
    }

    /// Run the half forever.
    pub async fn run(mut self) -> ! {
        let mut ticker = self.scheduler.policy().maintenance_period().map(Ticker::every);
        let free_running = self.scheduler.policy().free_running();
        info!(
            "Keyboard half running on pipe {}, free running: {}",
            self.scheduler.pipe(),
            free_running
        );

        self.matrix.scan();
        loop {
            let tick = async {
                match ticker.as_mut() {
                    Some(ticker) => ticker.next().await,
                    None => core::future::pending().await,
                }
            };
            let trigger = match select(self.wait_for_scan(free_running), tick).await {
                Either::First(()) => Trigger::Scan,
                Either::Second(()) => Trigger::Maintenance,
            };
            self.handle(trigger, Instant::now());
        }
    }

    async fn wait_for_scan(&mut self, free_running: bool) {
        if free_running {
            yield_now().await;
            return;
        }

        #[cfg(feature = "async_matrix")]
        self.matrix.wait_for_key().await;

        #[cfg(not(feature = "async_matrix"))]
        Timer::after(self.poll_interval).await;
    }

    pub fn snapshot(&self) -> &KeySnapshot<ROW> {
        self.matrix.snapshot()
    }

    pub fn matrix(&self) -> &MatrixScanner<In, Out, D, ROW, COL, COL2ROW> {
        &self.matrix
    }

    pub fn scheduler(&self) -> &TransmitScheduler<T, P, ROW> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TransmitScheduler<T, P, ROW> {
        &mut self.scheduler
    }
}
