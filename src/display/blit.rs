//! Blit pipeline: truecolor surface in, windowed 5-6-5 scanlines out.
//!
//! Every update redraws the full clamped region, one scanline per windowed
//! write; no double buffering, no damage-rectangle diffing. That trades bus
//! bandwidth for simplicity, and the bus is the panel's only consumer.

use byteorder::{BigEndian, ByteOrder};

use crate::display::st7789::{Panel, BYTES_PER_PIXEL};
use crate::error::DriverError;
use crate::hal::mmio::RegisterBlock;

/// Fixed capacity of the scanline staging buffer. Sized generously past the
/// panel's native row size and never grown: an update that would need more
/// is an error, not a resize.
pub const STAGING_CAPACITY: usize = 2048;

/// Read-only view of the host truecolor surface owned by the windowing
/// layer. Geometry and byte layout are whatever that layer says they are;
/// nothing here assumes a fixed stride or pixel size.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceView<'a> {
    /// Raw pixel bytes; each pixel starts with its red, green and blue
    /// channel bytes (any trailing padding byte is ignored).
    pub pixels: &'a [u8],
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub pitch: usize,
    /// Bytes per pixel, at least 3.
    pub bytes_per_pixel: usize,
}

/// A damage rectangle in surface coordinates. Accepted for interface
/// compatibility; the pipeline redraws the full clamped extent regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Pack 8-bit channels into the panel's 16-bit 5-6-5 wire format.
#[inline]
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Stream `surface` to the panel, clamped to the panel resolution. Excess
/// surface content is cropped, never scaled. On any error nothing further
/// is sent and the already-written scanlines simply remain on screen.
pub fn blit_frame<S: RegisterBlock, G: RegisterBlock>(
    panel: &Panel<S, G>,
    surface: &SurfaceView<'_>,
) -> Result<(), DriverError> {
    let config = panel.config();
    let w = surface.width.min(config.width as u32) as usize;
    let h = surface.height.min(config.height as u32) as usize;
    if w == 0 || h == 0 {
        return Ok(());
    }

    let required = w * BYTES_PER_PIXEL;
    if required > STAGING_CAPACITY {
        return Err(DriverError::StagingOverflow {
            required,
            capacity: STAGING_CAPACITY,
        });
    }
    check_surface_layout(surface, w, h)?;

    let mut staging = [0u8; STAGING_CAPACITY];
    let last_col = (w - 1) as u16;
    for y in 0..h {
        for x in 0..w {
            let at = y * surface.pitch + x * surface.bytes_per_pixel;
            let packed = pack_rgb565(
                surface.pixels[at],
                surface.pixels[at + 1],
                surface.pixels[at + 2],
            );
            BigEndian::write_u16(&mut staging[x * BYTES_PER_PIXEL..][..2], packed);
        }

        // The controller has no cached window; reprogram before every
        // scanline. With the axis-swap orientation the column setter takes
        // the scanline index and the row setter takes the column span.
        let row = y as u16;
        if config.axis_swap {
            panel.set_window(row, row, 0, last_col)?;
        } else {
            panel.set_window(0, last_col, row, row)?;
        }
        panel.write_pixels(&staging[..required])?;
    }
    Ok(())
}

/// Reject a surface whose buffer cannot hold its declared clamped layout,
/// before any pixel is read or any command issued.
fn check_surface_layout(
    surface: &SurfaceView<'_>,
    w: usize,
    h: usize,
) -> Result<(), DriverError> {
    let required = if surface.bytes_per_pixel < 3 {
        usize::MAX
    } else {
        (h - 1) * surface.pitch + (w - 1) * surface.bytes_per_pixel + 3
    };
    if surface.pixels.len() < required {
        return Err(DriverError::SurfaceMismatch {
            required,
            len: surface.pixels.len(),
        });
    }
    Ok(())
}
