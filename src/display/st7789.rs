//! ST7789 controller protocol: reset, initialization, windowed writes.
//!
//! The panel is a black box driven by single-byte command opcodes over the
//! SPI transfer engine. Bring-up is a strictly linear one-shot sequence; the
//! settle delays between commands come from the controller datasheet and
//! must not be shortened. Running it twice without a teardown is safe but
//! re-pays the whole delay budget.

use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use log::info;

use crate::config::PanelConfig;
use crate::error::DriverError;
use crate::hal::gpio::PinMode;
use crate::hal::mmio::RegisterBlock;
use crate::hal::spi::SpiBus;

/// ST7789 command opcodes.
pub mod cmd {
    /// Sleep out.
    pub const SLPOUT: u8 = 0x11;
    /// Partial off (normal display mode).
    pub const NORON: u8 = 0x13;
    /// Display inversion on.
    pub const INVON: u8 = 0x21;
    /// Display off.
    pub const DISPOFF: u8 = 0x28;
    /// Display on.
    pub const DISPON: u8 = 0x29;
    /// Column address set.
    pub const CASET: u8 = 0x2A;
    /// Row address set.
    pub const RASET: u8 = 0x2B;
    /// Memory write.
    pub const RAMWR: u8 = 0x2C;
    /// Memory access control.
    pub const MADCTL: u8 = 0x36;
    /// Vertical scroll start address of RAM.
    pub const VSCSAD: u8 = 0x37;
    /// Pixel format set.
    pub const COLMOD: u8 = 0x3A;
    /// Digital gamma enable.
    pub const DGMEN: u8 = 0xBA;
}

/// COLMOD value for 16 bits/pixel.
const COLMOD_16BPP: u8 = 0x05;

/// Bytes per pixel on the wire (5-6-5).
pub const BYTES_PER_PIXEL: usize = 2;

/// Deliberately slow divisor for bring-up, so initialization succeeds even
/// when the configured operating speed is more than the panel can take yet.
const INIT_CLOCK_DIVISOR: u32 = 34;

const RESET_SETTLE: Duration = Duration::from_millis(120);
const SLPOUT_SETTLE: Duration = Duration::from_millis(120);
const COLMOD_SETTLE: Duration = Duration::from_millis(20);
const MADCTL_SETTLE: Duration = Duration::from_millis(10);
const NORON_SETTLE: Duration = Duration::from_millis(10);
const DISPON_SETTLE: Duration = Duration::from_millis(100);
// Restoring the clock immediately after the clear has been observed to
// leave the panel uninitialized; give it a moment first.
const CLOCK_RESTORE_SETTLE: Duration = Duration::from_millis(10);

/// An initialized-or-initializing ST7789 panel on an SPI bus.
pub struct Panel<S: RegisterBlock, G: RegisterBlock> {
    bus: SpiBus<S, G>,
    config: PanelConfig,
}

impl<S: RegisterBlock, G: RegisterBlock> Panel<S, G> {
    pub fn new(bus: SpiBus<S, G>, config: PanelConfig) -> Self {
        Self { bus, config }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Three-edge power-on reset followed by the full command sequence,
    /// a black clear and power-on. Leaves the bus at the configured
    /// operating speed.
    pub fn init(&self) -> Result<(), DriverError> {
        let gpio = self.bus.gpio();

        info!(
            "resetting panel via reset pin GPIO {}",
            self.config.reset_pin
        );
        gpio.set_mode(self.config.reset_pin, PinMode::Output)?;
        gpio.set(self.config.reset_pin)?;
        thread::sleep(RESET_SETTLE);
        gpio.clear(self.config.reset_pin)?;
        thread::sleep(RESET_SETTLE);
        gpio.set(self.config.reset_pin)?;
        thread::sleep(RESET_SETTLE);

        self.bus.set_clock_divider(INIT_CLOCK_DIVISOR);

        self.bus.send_command_only(cmd::SLPOUT)?;
        thread::sleep(SLPOUT_SETTLE);

        self.bus.send_command_with_byte(cmd::COLMOD, COLMOD_16BPP)?;
        thread::sleep(COLMOD_SETTLE);

        self.bus
            .send_command_with_byte(cmd::MADCTL, self.config.madctl())?;
        thread::sleep(MADCTL_SETTLE);

        self.bus.send_command_with_byte(cmd::DGMEN, 0x04)?;
        self.bus.send_command_only(cmd::INVON)?;
        self.bus.send_command_only(cmd::NORON)?;
        thread::sleep(NORON_SETTLE);

        // With row address order swapped, writes to the first `height` rows
        // land in the invisible tail of the controller's taller RAM; shift
        // the visible window down by the difference.
        if self.config.row_order_swapped() {
            let mut vsp = [0u8; 2];
            BigEndian::write_u16(&mut vsp, self.config.scroll_offset());
            self.bus.send_command(cmd::VSCSAD, &vsp)?;
        }

        // Never show uninitialized controller memory.
        self.fill_rect(0, 0, self.config.width, self.config.height, 0x0000)?;

        if let Some(backlight) = self.config.backlight_pin {
            gpio.set_mode(backlight, PinMode::Output)?;
            gpio.set(backlight)?;
        }

        self.bus.send_command_only(cmd::DISPON)?;
        thread::sleep(DISPON_SETTLE);

        thread::sleep(CLOCK_RESTORE_SETTLE);
        self.bus.set_clock_divider(self.config.clock_divisor);
        info!(
            "panel up: {}x{}, MADCTL {:#04x}, clock divisor {}",
            self.config.width,
            self.config.height,
            self.config.madctl(),
            self.config.clock_divisor
        );
        Ok(())
    }

    /// Program the address window for subsequent pixel writes. The
    /// controller auto-increments within the last programmed window, so this
    /// must precede every [`write_pixels`](Self::write_pixels).
    pub fn set_window(&self, x0: u16, x1: u16, y0: u16, y1: u16) -> Result<(), DriverError> {
        self.send_addr(cmd::CASET, x0, x1)?;
        self.send_addr(cmd::RASET, y0, y1)
    }

    /// Stream packed pixel bytes into the current window.
    pub fn write_pixels(&self, pixels: &[u8]) -> Result<(), DriverError> {
        self.bus.send_command(cmd::RAMWR, pixels)
    }

    /// Fill a rectangle with one packed 5-6-5 color, row by row.
    pub fn fill_rect(&self, x: u16, y: u16, w: u16, h: u16, color: u16) -> Result<(), DriverError> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let mut row = vec![0u8; w as usize * BYTES_PER_PIXEL];
        for pixel in row.chunks_exact_mut(BYTES_PER_PIXEL) {
            BigEndian::write_u16(pixel, color);
        }
        for line in y..y + h {
            self.set_window(x, x + w - 1, line, line)?;
            self.write_pixels(&row)?;
        }
        Ok(())
    }

    /// Display off and backlight off. The peripheral mapping outlives this
    /// and is released by the owning driver.
    pub fn power_off(&self) -> Result<(), DriverError> {
        info!("powering panel off");
        self.bus.send_command_only(cmd::DISPOFF)?;
        if let Some(backlight) = self.config.backlight_pin {
            self.bus.gpio().clear(backlight)?;
        }
        Ok(())
    }

    fn send_addr(&self, command: u8, start: u16, end: u16) -> Result<(), DriverError> {
        let mut addr = [0u8; 4];
        BigEndian::write_u16(&mut addr[0..2], start);
        BigEndian::write_u16(&mut addr[2..4], end);
        self.bus.send_command(command, &addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::gpio::Gpio;
    use crate::testutil::{init_logging, FakeGpio, FakeSpi};

    fn panel(config: PanelConfig) -> (Panel<FakeSpi, FakeGpio>, FakeSpi, FakeGpio) {
        let spi = FakeSpi::new();
        let gpio = FakeGpio::new();
        let bus = SpiBus::new(spi.clone(), Gpio::new(gpio.clone()), config.dc_pin);
        (Panel::new(bus, config), spi, gpio)
    }

    #[test]
    fn test_window_coordinates_are_big_endian_pairs() {
        let (panel, spi, _gpio) = panel(PanelConfig::default());
        panel.set_window(5, 239, 0x0102, 0x0304).unwrap();
        let txns = spi.transactions();
        assert_eq!(txns[0], vec![cmd::CASET, 0, 5, 0, 239]);
        assert_eq!(txns[1], vec![cmd::RASET, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_init_sequence_order_and_clock() {
        init_logging();
        let (panel, spi, gpio) = panel(PanelConfig::default());
        panel.init().unwrap();

        let txns = spi.transactions();
        let commands: Vec<u8> = txns.iter().map(|t| t[0]).collect();

        // Command sequence before the clear; default MADCTL has row order
        // un-swapped, so no scroll compensation is issued.
        assert_eq!(
            &commands[..6],
            &[
                cmd::SLPOUT,
                cmd::COLMOD,
                cmd::MADCTL,
                cmd::DGMEN,
                cmd::INVON,
                cmd::NORON
            ]
        );
        assert_eq!(txns[1], vec![cmd::COLMOD, COLMOD_16BPP]);
        assert_eq!(txns[2], vec![cmd::MADCTL, 0x48]);

        // Clear: one CASET/RASET/RAMWR triple per visible row, then
        // display on last.
        let ramwr = commands.iter().filter(|&&c| c == cmd::RAMWR).count();
        assert_eq!(ramwr, 240);
        assert_eq!(*commands.last().unwrap(), cmd::DISPON);

        // Operating clock restored after init, backlight and reset high.
        assert_eq!(spi.clock_divider(), PanelConfig::default().clock_divisor);
        assert!(gpio.level(PanelConfig::default().reset_pin));
        assert!(gpio.level(PanelConfig::default().backlight_pin.unwrap()));
    }

    #[test]
    fn test_scroll_compensation_when_row_order_swapped() {
        let config = PanelConfig {
            rotate_180: false,
            backlight_pin: None,
            ..PanelConfig::default()
        };
        let (panel, spi, _gpio) = panel(config);
        panel.init().unwrap();

        let txns = spi.transactions();
        let vscsad: Vec<&Vec<u8>> = txns.iter().filter(|t| t[0] == cmd::VSCSAD).collect();
        // 320-line RAM, 240 visible: shift by 80.
        assert_eq!(vscsad, vec![&vec![cmd::VSCSAD, 0x00, 0x50]]);
    }

    #[test]
    fn test_power_off_sequence() {
        let (panel, spi, gpio) = panel(PanelConfig::default());
        panel.power_off().unwrap();
        assert_eq!(spi.transactions(), vec![vec![cmd::DISPOFF]]);
        assert!(!gpio.level(PanelConfig::default().backlight_pin.unwrap()));
    }
}
