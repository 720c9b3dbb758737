#![no_std]
#![no_main]

use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::Priority;
use embassy_time::Delay;
use interphase::transport::gazell::GazellTransport;
#[cfg(feature = "continuous")]
use interphase::Continuous;
#[cfg(not(feature = "continuous"))]
use interphase::Periodic;
use interphase::{
    BUILD_SIDE, LinkMonitor, MatrixScanner, RadioConfig, TransmitScheduler, WirelessHalf, bring_up,
    register_event_handler,
};
use panic_probe as _;

const ROW: usize = 5;
const COL: usize = 7;

/// Receives Gazell callbacks from the radio interrupt
static LINK_MONITOR: LinkMonitor = LinkMonitor::new();

/// Columns are pulled down and read high through the diode of a pressed key, rows are driven high.
macro_rules! config_matrix_pins {
    (peripherals: $p:ident, input: [$($in_pin:ident), *], output: [$($out_pin:ident), +]) => {
        {
            let input_pins = [$(Input::new($p.$in_pin, Pull::Down)), +];
            let output_pins = [$(Output::new($p.$out_pin, Level::Low, OutputDrive::Standard)), +];
            (input_pins, output_pins)
        }
    };
}

// Gazell ships its interrupt handlers under CMSIS names, the vector table uses the PAC names
unsafe extern "C" {
    fn RADIO_IRQHandler();
    fn TIMER2_IRQHandler();
    fn SWI0_EGU0_IRQHandler();
}

#[unsafe(no_mangle)]
extern "C" fn RADIO() {
    unsafe { RADIO_IRQHandler() }
}

#[unsafe(no_mangle)]
extern "C" fn TIMER2() {
    unsafe { TIMER2_IRQHandler() }
}

#[unsafe(no_mangle)]
extern "C" fn SWI0_EGU0() {
    unsafe { SWI0_EGU0_IRQHandler() }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Interphase {} half start", BUILD_SIDE);

    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);

    // Radio first, the matrix is useless without a link
    let radio_config = RadioConfig::default();
    let mut transport = GazellTransport::new();
    register_event_handler(&LINK_MONITOR);
    unwrap!(bring_up(&mut transport, &radio_config));

    // Pin config
    #[cfg(not(feature = "right"))]
    let (input_pins, output_pins) = config_matrix_pins!(
        peripherals: p,
        input: [P0_03, P0_04, P0_28, P0_29, P0_30, P0_31, P0_05],
        output: [P0_07, P0_11, P0_12, P0_13, P0_14]
    );
    #[cfg(feature = "right")]
    let (input_pins, output_pins) = config_matrix_pins!(
        peripherals: p,
        input: [P0_15, P0_16, P0_17, P0_18, P0_19, P0_20, P0_22],
        output: [P0_23, P0_24, P0_25, P0_26, P0_27]
    );

    let matrix = MatrixScanner::<_, _, _, ROW, COL, false>::new(output_pins, input_pins, Delay);

    #[cfg(feature = "continuous")]
    let policy = Continuous::default();
    #[cfg(not(feature = "continuous"))]
    let policy = Periodic::default();

    let scheduler = TransmitScheduler::new(transport, policy, radio_config.pipe);
    WirelessHalf::new(matrix, scheduler).run().await
}
