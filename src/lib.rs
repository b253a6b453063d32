//! Userspace ST7789 SPI TFT driver for Raspberry Pi.
//!
//! Talks directly to the BCM2711-class SoC's memory-mapped SPI0 and GPIO
//! peripherals (via `/dev/mem`) and streams a host truecolor surface to the
//! panel as windowed 5-6-5 scanline writes.
//!
//! # Architecture
//!
//! ```text
//! Windowing layer (external)
//!         │ SurfaceView + damage Rects
//!         ▼
//! ┌───────────────┐
//! │    Driver     │ init_display / update / shutdown
//! └───────┬───────┘
//!         ▼
//! ┌───────────────┐   ┌───────────────┐
//! │ Blit pipeline │──▶│ Panel (ST7789)│ window + RAMWR protocol
//! └───────────────┘   └───────┬───────┘
//!                             ▼
//!                     ┌───────────────┐
//!                     │ SpiBus + Gpio │ polled FIFO engine, DC framing
//!                     └───────┬───────┘
//!                             ▼
//!                     ┌───────────────┐
//!                     │ PeripheralMap │ /dev/mem, volatile 32-bit MMIO
//!                     └───────────────┘
//! ```
//!
//! Everything is single-threaded and synchronous: GPIO toggles, SPI
//! transactions and full-frame blits all run to completion on the calling
//! thread, with busy-wait polling and fixed datasheet delays as the only
//! pauses. There are no timeouts on the polls; an unresponsive bus blocks
//! forever, which is the accepted contract of polled hardware I/O.
//!
//! # Example
//!
//! ```no_run
//! use rpi_st7789::{Driver, PanelConfig, SurfaceView};
//!
//! let mut driver = Driver::init_display(PanelConfig::default())?;
//! let pixels = vec![0u8; 240 * 240 * 4];
//! let surface = SurfaceView {
//!     pixels: &pixels,
//!     width: 240,
//!     height: 240,
//!     pitch: 240 * 4,
//!     bytes_per_pixel: 4,
//! };
//! driver.update(&surface, &[])?;
//! driver.shutdown();
//! # Ok::<(), rpi_st7789::DriverError>(())
//! ```

pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod hal;

#[cfg(test)]
mod testutil;

pub use config::PanelConfig;
pub use display::{pack_rgb565, Rect, SurfaceView};
pub use driver::Driver;
pub use error::{DriverError, MappingError};
