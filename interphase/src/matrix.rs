//! Key matrix scanning.
//!
//! Rows are outputs and columns are inputs. A scan activates one row at a time, samples every column
//! and deactivates the row again before moving on, so that keys on other rows sharing a column line
//! never show up in the sampled row. There is no debouncing: the single read taken while the row is
//! active is the state of the key.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
#[cfg(feature = "async_matrix")]
use {
    core::pin::pin, embassy_futures::select::select_slice, embedded_hal_async::digital::Wait, heapless::Vec,
};

/// Settle time between activating a row and sampling the columns
const ROW_SETTLE_MICROS: u32 = 1;

/// Per-row column bitmasks sampled at one instant.
///
/// Column `c` of a row is stored in bit `7 - c`, so the first column is the most significant bit and
/// unused low bits stay zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySnapshot<const ROW: usize> {
    rows: [u8; ROW],
}

impl<const ROW: usize> Default for KeySnapshot<ROW> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ROW: usize> KeySnapshot<ROW> {
    /// Snapshot with every key released
    pub const fn new() -> Self {
        Self { rows: [0; ROW] }
    }

    /// Build a snapshot from raw row bitmasks
    pub const fn from_rows(rows: [u8; ROW]) -> Self {
        Self { rows }
    }

    /// Bit of column `col` inside a row byte
    pub const fn column_bit(col: usize) -> u8 {
        0x80 >> col
    }

    /// Mask of the bits used by a matrix with `cols` columns
    pub const fn column_mask(cols: usize) -> u8 {
        if cols >= 8 { 0xFF } else { !(0xFF >> cols) }
    }

    pub fn rows(&self) -> &[u8; ROW] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> u8 {
        self.rows[row]
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.rows[row] & Self::column_bit(col) != 0
    }

    /// True if no key is pressed
    pub fn is_idle(&self) -> bool {
        self.rows.iter().all(|r| *r == 0)
    }

    pub(crate) fn set_row(&mut self, row: usize, bits: u8) {
        self.rows[row] = bits;
    }
}

/// Column input, sampled while a row is active.
pub trait ActiveIn<const COL2ROW: bool>: ErrorType {
    /// True if the key on this column is pressed in the active row. A failed read counts as released.
    fn is_active(&mut self) -> bool;
    /// Resolve on the next level change of the column line
    #[cfg(feature = "async_matrix")]
    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error>;
}

impl<
    #[cfg(feature = "async_matrix")] In: InputPin + Wait,
    #[cfg(not(feature = "async_matrix"))] In: InputPin,
    const COL2ROW: bool,
> ActiveIn<COL2ROW> for In
{
    fn is_active(&mut self) -> bool {
        if COL2ROW {
            self.is_low().ok().unwrap_or_default()
        } else {
            self.is_high().ok().unwrap_or_default()
        }
    }

    #[cfg(feature = "async_matrix")]
    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        Wait::wait_for_any_edge(self).await
    }
}

/// Row driver.
pub trait ActiveOut<const COL2ROW: bool> {
    /// Stop driving the row, keys on it no longer reach the columns
    fn deactivate(&mut self);
    /// Drive the row so its pressed keys show up on the columns
    fn activate(&mut self);
}

impl<Out: OutputPin, const COL2ROW: bool> ActiveOut<COL2ROW> for Out {
    fn deactivate(&mut self) {
        if COL2ROW {
            self.set_high().ok();
        } else {
            self.set_low().ok();
        }
    }

    fn activate(&mut self) {
        if COL2ROW {
            self.set_low().ok();
        } else {
            self.set_high().ok();
        }
    }
}

/// All rows of the matrix held active, deactivated again on drop.
#[cfg(feature = "async_matrix")]
struct ActiveRows<'a, Out: ActiveOut<COL2ROW>, const ROW: usize, const COL2ROW: bool> {
    row_pins: &'a mut [Out; ROW],
}

#[cfg(feature = "async_matrix")]
impl<'a, Out: ActiveOut<COL2ROW>, const ROW: usize, const COL2ROW: bool> ActiveRows<'a, Out, ROW, COL2ROW> {
    fn activate(row_pins: &'a mut [Out; ROW]) -> Self {
        for row_pin in row_pins.iter_mut() {
            row_pin.activate();
        }
        Self { row_pins }
    }
}

#[cfg(feature = "async_matrix")]
impl<Out: ActiveOut<COL2ROW>, const ROW: usize, const COL2ROW: bool> Drop for ActiveRows<'_, Out, ROW, COL2ROW> {
    fn drop(&mut self) {
        for row_pin in self.row_pins.iter_mut() {
            row_pin.deactivate();
        }
    }
}

/// Scanner of the physical key matrix.
///
/// The scanner is the only writer of its [`KeySnapshot`]; every other part of the firmware reads it
/// through [`MatrixScanner::snapshot`].
pub struct MatrixScanner<
    In: ActiveIn<COL2ROW>,
    Out: ActiveOut<COL2ROW>,
    D: DelayNs,
    const ROW: usize,
    const COL: usize,
    const COL2ROW: bool,
> {
    /// Row pins of the pcb matrix, driven one at a time
    row_pins: [Out; ROW],
    /// Column pins of the pcb matrix, sampled while a row is active
    col_pins: [In; COL],
    /// Settle delay after activating a row
    delay: D,
    /// Result of the latest scan
    snapshot: KeySnapshot<ROW>,
}

impl<
    In: ActiveIn<COL2ROW>,
    Out: ActiveOut<COL2ROW>,
    D: DelayNs,
    const ROW: usize,
    const COL: usize,
    const COL2ROW: bool,
> MatrixScanner<In, Out, D, ROW, COL, COL2ROW>
{
    const _COL_FITS_ROW_BYTE: () = assert!(COL <= 8, "A row bitmask holds at most 8 columns");

    /// Create a scanner from row and column pins. All rows start deactivated.
    pub fn new(mut row_pins: [Out; ROW], col_pins: [In; COL], delay: D) -> Self {
        let () = Self::_COL_FITS_ROW_BYTE;
        for row_pin in row_pins.iter_mut() {
            row_pin.deactivate();
        }
        MatrixScanner {
            row_pins,
            col_pins,
            delay,
            snapshot: KeySnapshot::new(),
        }
    }

    /// Sample the whole matrix, overwriting the previous snapshot.
    pub fn scan(&mut self) -> &KeySnapshot<ROW> {
        for row_idx in 0..ROW {
            let bits = self.read_row(row_idx);
            self.snapshot.set_row(row_idx, bits);
        }
        &self.snapshot
    }

    /// The latest scan result
    pub fn snapshot(&self) -> &KeySnapshot<ROW> {
        &self.snapshot
    }

    fn read_row(&mut self, row_idx: usize) -> u8 {
        // Activate output pin, wait 1us ensuring the change comes into effect
        self.row_pins[row_idx].activate();
        self.delay.delay_us(ROW_SETTLE_MICROS);

        let mut bits = 0u8;
        for (col_idx, col_pin) in self.col_pins.iter_mut().enumerate() {
            if col_pin.is_active() {
                bits |= KeySnapshot::<ROW>::column_bit(col_idx);
            }
        }

        self.row_pins[row_idx].deactivate();
        bits
    }

    /// Wait until any key changes state.
    ///
    /// All rows are activated so that a press or release anywhere in the matrix produces an edge on a
    /// column line. They are deactivated again when an edge arrives or when the wait is dropped, so a
    /// scan after an interrupted wait still sees one row at a time.
    #[cfg(feature = "async_matrix")]
    pub async fn wait_for_key(&mut self) {
        let _rows = ActiveRows::<_, ROW, COL2ROW>::activate(&mut self.row_pins);
        self.delay.delay_us(ROW_SETTLE_MICROS);

        let mut futs: Vec<_, COL> = self
            .col_pins
            .iter_mut()
            .map(|col_pin| col_pin.wait_for_any_edge())
            .collect();
        let _ = select_slice(pin!(futs.as_mut_slice())).await;
    }
}
