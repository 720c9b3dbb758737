#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::future::poll_fn;
use std::rc::Rc;
use std::task::Poll;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::digital::Wait;
use embedded_hal_mock::eh1::delay::NoopDelay;
use interphase::{KeySnapshot, MatrixScanner};

pub const ROW: usize = 5;
pub const COL: usize = 7;

/// Scanner wired to a [`SimBoard`], rows driven high, columns pulled down
pub type SimScanner = MatrixScanner<SimCol, SimRow, NoopDelay, ROW, COL, false>;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Electrical model of a diode matrix.
///
/// A column reads high when at least one active row has a pressed key on it. Pressing or releasing a
/// key raises an edge that the next column wait consumes.
#[derive(Default)]
struct Matrix {
    pressed: [[bool; COL]; ROW],
    active: [bool; ROW],
    edge_pending: bool,
    /// Most rows seen active while a column was sampled
    max_active_on_read: usize,
    reads: usize,
}

impl Matrix {
    fn active_rows(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }
}

#[derive(Clone, Default)]
pub struct SimBoard(Rc<RefCell<Matrix>>);

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, row: usize, col: usize) {
        let mut matrix = self.0.borrow_mut();
        matrix.pressed[row][col] = true;
        matrix.edge_pending = true;
    }

    pub fn release(&self, row: usize, col: usize) {
        let mut matrix = self.0.borrow_mut();
        matrix.pressed[row][col] = false;
        matrix.edge_pending = true;
    }

    pub fn press_all(&self) {
        let mut matrix = self.0.borrow_mut();
        matrix.pressed = [[true; COL]; ROW];
        matrix.edge_pending = true;
    }

    pub fn release_all(&self) {
        let mut matrix = self.0.borrow_mut();
        matrix.pressed = [[false; COL]; ROW];
        matrix.edge_pending = true;
    }

    pub fn max_active_on_read(&self) -> usize {
        self.0.borrow().max_active_on_read
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }

    pub fn any_row_active(&self) -> bool {
        self.0.borrow().active_rows() > 0
    }

    /// Key state a correct scan of the board must produce
    pub fn expected(&self) -> KeySnapshot<ROW> {
        let matrix = self.0.borrow();
        let mut rows = [0u8; ROW];
        for (row, bits) in rows.iter_mut().enumerate() {
            for col in 0..COL {
                if matrix.pressed[row][col] {
                    *bits |= KeySnapshot::<ROW>::column_bit(col);
                }
            }
        }
        KeySnapshot::from_rows(rows)
    }

    pub fn scanner(&self) -> SimScanner {
        let rows = core::array::from_fn(|row| SimRow {
            board: self.clone(),
            row,
        });
        let cols = core::array::from_fn(|col| SimCol {
            board: self.clone(),
            col,
        });
        MatrixScanner::new(rows, cols, NoopDelay::new())
    }
}

pub struct SimRow {
    board: SimBoard,
    row: usize,
}

impl ErrorType for SimRow {
    type Error = Infallible;
}

impl OutputPin for SimRow {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.0.borrow_mut().active[self.row] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.0.borrow_mut().active[self.row] = true;
        Ok(())
    }
}

pub struct SimCol {
    board: SimBoard,
    col: usize,
}

impl ErrorType for SimCol {
    type Error = Infallible;
}

impl InputPin for SimCol {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut matrix = self.board.0.borrow_mut();
        let active = matrix.active_rows();
        matrix.max_active_on_read = matrix.max_active_on_read.max(active);
        matrix.reads += 1;
        Ok((0..ROW).any(|row| matrix.active[row] && matrix.pressed[row][self.col]))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl SimCol {
    /// Pending until a key changes state anywhere on the board
    async fn edge(&mut self) -> Result<(), Infallible> {
        poll_fn(|cx| {
            let mut matrix = self.board.0.borrow_mut();
            if matrix.edge_pending {
                matrix.edge_pending = false;
                Poll::Ready(Ok(()))
            } else {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }
}

// The matrix only models key changes, every kind of wait resolves on the next one
impl Wait for SimCol {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.edge().await
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.edge().await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.edge().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.edge().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        self.edge().await
    }
}
