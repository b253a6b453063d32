//! Build-time wiring and panel configuration.
//!
//! Physical pin assignments and the panel's fixed resolution are properties
//! of the board, not runtime parameters. The defaults below match the
//! Waveshare-style 1.3" 240x240 ST7789 hat wiring:
//!
//! | Function       | BCM GPIO |
//! |----------------|----------|
//! | Data/Command   | GPIO 6   |
//! | Reset          | GPIO 5   |
//! | Backlight      | GPIO 13  |
//! | SPI0 CE1..SCLK | GPIO 7-11 (ALT0) |

/// Data/command select pin (low = command byte, high = payload).
pub const GPIO_TFT_DATA_CONTROL: u8 = 6;

/// Panel reset pin (three-edge power-on reset).
pub const GPIO_TFT_RESET: u8 = 5;

/// Backlight enable pin. Some panel variants have none.
pub const GPIO_TFT_BACKLIGHT: u8 = 13;

/// SPI0 bus pins (CE1, CE0, MISO, MOSI, SCLK), routed to ALT0 at bring-up.
pub const SPI_BUS_PINS: [u8; 5] = [7, 8, 9, 10, 11];

/// Operating SPI clock divisor requested by the board configuration
/// (core clock / divisor = bus clock).
pub const SPI_BUS_CLOCK_DIVISOR: u32 = 20;

/// Visible panel resolution.
pub const DISPLAY_WIDTH: u16 = 240;
pub const DISPLAY_HEIGHT: u16 = 240;

/// Height of the controller's graphics RAM. The ST7789 addresses a 320-line
/// memory of which only [`DISPLAY_HEIGHT`] lines are visible; the difference
/// drives the vertical-scroll compensation when row order is swapped.
pub const DISPLAY_RAM_HEIGHT: u16 = 320;

/// MADCTL bits (memory access control).
pub mod madctl {
    /// Row address order swap ("MY").
    pub const ROW_ORDER_SWAP: u8 = 1 << 7;
    /// Column address order swap ("MX").
    pub const COL_ORDER_SWAP: u8 = 1 << 6;
    /// BGR color order (0 = RGB).
    pub const BGR: u8 = 1 << 3;
    /// 180 degree rotation = both address orders flipped.
    pub const ROTATE_180: u8 = ROW_ORDER_SWAP | COL_ORDER_SWAP;
}

/// One panel variant, collapsed from the previously duplicated per-panel
/// driver copies: orientation bits, backlight handling and the blit axis
/// mapping are data here, selected once at driver construction.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Visible width in pixels.
    pub width: u16,
    /// Visible height in pixels.
    pub height: u16,
    /// Controller RAM height in lines (>= `height`).
    pub ram_height: u16,
    /// Data/command select pin.
    pub dc_pin: u8,
    /// Reset pin.
    pub reset_pin: u8,
    /// Backlight pin, if the variant has one.
    pub backlight_pin: Option<u8>,
    /// Clock divisor to run at after initialization.
    pub clock_divisor: u32,
    /// Swap row address order (MADCTL MY).
    pub row_swap: bool,
    /// Swap column address order (MADCTL MX).
    pub col_swap: bool,
    /// BGR color order. Needed whenever an address order swap is in effect.
    pub bgr: bool,
    /// Flip the final orientation by 180 degrees.
    pub rotate_180: bool,
    /// Issue window commands with X/Y setter roles interchanged. The blit
    /// pipeline's computed scanline index then lands in the column setter,
    /// keeping the visual result upright for this MADCTL choice.
    pub axis_swap: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            ram_height: DISPLAY_RAM_HEIGHT,
            dc_pin: GPIO_TFT_DATA_CONTROL,
            reset_pin: GPIO_TFT_RESET,
            backlight_pin: Some(GPIO_TFT_BACKLIGHT),
            clock_divisor: SPI_BUS_CLOCK_DIVISOR,
            row_swap: true,
            col_swap: false,
            bgr: true,
            rotate_180: true,
            axis_swap: true,
        }
    }
}

impl PanelConfig {
    /// Compute the MADCTL byte sent once during initialization. Not mutated
    /// afterwards; there is no runtime rotation.
    pub fn madctl(&self) -> u8 {
        let mut m = 0u8;
        if self.row_swap {
            m |= madctl::ROW_ORDER_SWAP;
        }
        if self.col_swap {
            m |= madctl::COL_ORDER_SWAP;
        }
        if self.bgr {
            m |= madctl::BGR;
        }
        if self.rotate_180 {
            m ^= madctl::ROTATE_180;
        }
        m
    }

    /// Vertical scroll start address compensating a swapped row order:
    /// writes to the first `height` rows otherwise land in the invisible
    /// tail of the controller RAM.
    pub fn scroll_offset(&self) -> u16 {
        self.ram_height - self.height
    }

    /// Whether the final MADCTL byte has row address order swapped.
    pub fn row_order_swapped(&self) -> bool {
        self.madctl() & madctl::ROW_ORDER_SWAP != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_madctl_matches_board_wiring() {
        // Row swap + BGR, then the 180 degree flip: 0x88 ^ 0xC0 = 0x48.
        let config = PanelConfig::default();
        assert_eq!(config.madctl(), 0x48);
        assert!(!config.row_order_swapped());
    }

    #[test]
    fn test_row_swap_without_rotation_keeps_my_set() {
        let config = PanelConfig {
            rotate_180: false,
            ..PanelConfig::default()
        };
        assert_eq!(config.madctl(), 0x88);
        assert!(config.row_order_swapped());
        assert_eq!(config.scroll_offset(), 80);
    }
}
