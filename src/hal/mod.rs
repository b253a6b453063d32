//! Hardware access layer for the BCM2711-class SoC:
//! peripheral mapping, GPIO pin control and the polled SPI engine.

pub mod gpio;
pub mod mmio;
pub mod spi;

pub use gpio::{Gpio, PinMode};
pub use mmio::{MappedBlock, RegisterBlock};
#[cfg(unix)]
pub use mmio::PeripheralMap;
pub use spi::SpiBus;
