//! Fake register backends for deterministic tests.
//!
//! `FakeSpi` models just enough of the SPI0 status machine for the polled
//! engine to run to completion: TXD and DONE always read as set, and a
//! configurable amount of pending RX data exercises the drain path. It
//! splits the FIFO byte stream into transactions by watching the
//! transfer-active bit, which is exactly how the hardware frames them.
//!
//! Both fakes are cheap `Rc` handles so a test can keep one clone for
//! inspection while the driver owns the other.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::hal::gpio::reg as gpio_reg;
use crate::hal::mmio::RegisterBlock;
use crate::hal::spi::{cs, reg as spi_reg};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct SpiState {
    active: Cell<bool>,
    clk: Cell<u32>,
    pending_rx: Cell<u32>,
    transactions: RefCell<Vec<Vec<u8>>>,
}

/// Always-ready SPI register file recording every transaction.
#[derive(Clone, Default)]
pub struct FakeSpi(Rc<SpiState>);

impl FakeSpi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction seen so far, each as `[command, payload...]`.
    pub fn transactions(&self) -> Vec<Vec<u8>> {
        self.0.transactions.borrow().clone()
    }

    /// Last value written to the clock divider register.
    pub fn clock_divider(&self) -> u32 {
        self.0.clk.get()
    }

    /// Make the RX FIFO report data until `n` clear-RX writes have landed.
    pub fn inject_rx(&self, n: u32) {
        self.0.pending_rx.set(n);
    }

    pub fn pending_rx(&self) -> u32 {
        self.0.pending_rx.get()
    }
}

impl RegisterBlock for FakeSpi {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            spi_reg::CS => {
                let mut status = cs::DONE | cs::TXD;
                if self.0.pending_rx.get() > 0 {
                    status |= cs::RXD;
                }
                status
            }
            spi_reg::CLK => self.0.clk.get(),
            _ => 0,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        match offset {
            spi_reg::CS => {
                let ta = value & cs::TA != 0;
                if ta && !self.0.active.get() {
                    self.0.transactions.borrow_mut().push(Vec::new());
                }
                if value & cs::CLEAR_RX != 0 {
                    let pending = self.0.pending_rx.get();
                    self.0.pending_rx.set(pending.saturating_sub(1));
                }
                self.0.active.set(ta);
            }
            spi_reg::FIFO => {
                let mut txns = self.0.transactions.borrow_mut();
                if let Some(current) = txns.last_mut() {
                    current.push(value as u8);
                }
            }
            spi_reg::CLK => self.0.clk.set(value),
            _ => {}
        }
    }
}

#[derive(Default)]
struct GpioState {
    fsel: [Cell<u32>; 6],
    lev: Cell<u32>,
}

/// GPIO register file where set/clear writes drive the level word.
#[derive(Clone, Default)]
pub struct FakeGpio(Rc<GpioState>);

impl FakeGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw function-select word `index` (pins `index*10 ..`).
    pub fn fsel(&self, index: usize) -> u32 {
        self.0.fsel[index].get()
    }

    /// Current output level of `pin`.
    pub fn level(&self, pin: u8) -> bool {
        self.0.lev.get() & (1 << pin) != 0
    }
}

impl RegisterBlock for FakeGpio {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            o if o <= 0x14 => self.0.fsel[o / 4].get(),
            gpio_reg::GPLEV0 => self.0.lev.get(),
            _ => 0,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        match offset {
            o if o <= 0x14 => self.0.fsel[o / 4].set(value),
            gpio_reg::GPSET0 => self.0.lev.set(self.0.lev.get() | value),
            gpio_reg::GPCLR0 => self.0.lev.set(self.0.lev.get() & !value),
            _ => {}
        }
    }
}
