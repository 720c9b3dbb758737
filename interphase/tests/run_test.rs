mod common;
pub(crate) use crate::common::*;

mod run_test {
    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use embassy_futures::yield_now;
    use embassy_time::{Duration, MockDriver};
    use interphase::transport::sim::SimulatedTransport;
    use interphase::{LinkMonitor, Periodic, RadioConfig, TransmitScheduler, WirelessHalf, bring_up};
    use rusty_fork::rusty_fork_test;

    use super::*;

    const TICK: Duration = Duration::from_millis(125);

    /// Let the half handle whatever became ready
    async fn settle() {
        for _ in 0..10 {
            yield_now().await;
        }
    }

    // The mock time driver is process global, each test runs in its own process
    rusty_fork_test! {
        #[test]
        fn test_periodic_run_repeats_held_key_on_every_tick() {
            let board = SimBoard::new();
            board.press(3, 0);
            let monitor = LinkMonitor::new();
            let mut sim = SimulatedTransport::with_handler(&monitor);
            bring_up(&mut sim, &RadioConfig::default()).unwrap();
            let half = WirelessHalf::new(
                board.scanner(),
                TransmitScheduler::new(&mut sim, Periodic::new(TICK), 0),
            );

            block_on(select(half.run(), async {
                for _ in 0..3 {
                    settle().await;
                    MockDriver::get().advance(TICK);
                }
                settle().await;
            }));

            assert_eq!(sim.sent_count(), 3);
            assert!(sim.sent().all(|frame| frame.bytes.as_slice() == [0, 0, 0, 0b1000_0000, 0]));
            // Ticks racing the key wait never leave other rows driven during a scan
            assert_eq!(board.max_active_on_read(), 1);
            assert_eq!(monitor.delivered(), 3);
        }

        #[test]
        fn test_periodic_run_reports_release_on_next_tick() {
            let board = SimBoard::new();
            board.press(1, 5);
            let monitor = LinkMonitor::new();
            let mut sim = SimulatedTransport::with_handler(&monitor);
            bring_up(&mut sim, &RadioConfig::default()).unwrap();
            let half = WirelessHalf::new(
                board.scanner(),
                TransmitScheduler::new(&mut sim, Periodic::new(TICK), 0),
            );

            block_on(select(half.run(), async {
                settle().await;
                MockDriver::get().advance(TICK);
                settle().await;
                board.release(1, 5);
                settle().await;
                MockDriver::get().advance(TICK);
                settle().await;
            }));

            let frames: Vec<_> = sim.sent().map(|f| f.bytes.clone()).collect();
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0].as_slice(), &[0, 0b0000_0100, 0, 0, 0]);
            assert_eq!(frames[1].as_slice(), &[0; ROW]);
            assert_eq!(board.max_active_on_read(), 1);
        }
    }
}
