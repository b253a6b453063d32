//! Register Access Layer: `/dev/mem` peripheral mapping.
//!
//! The SoC places its peripherals in one physical window (`0xFE00_0000` on
//! BCM2711). [`PeripheralMap::open`] maps that window read/write and derives
//! fixed-offset views for the SPI0 and GPIO register files. `/dev/mem` is
//! opened with `O_SYNC` so the mapping is uncached, and every access goes
//! through volatile 32-bit loads/stores matching the hardware register width.
//!
//! All register views are tied to the single process-wide mapping and must
//! not outlive it; the driver owns both together.

use std::fs;
use std::io;

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::error::MappingError;

/// Offset of the GPIO register file within the peripheral window.
pub const GPIO_OFFSET: usize = 0x20_0000;

/// Offset of the SPI0 register file within the peripheral window.
pub const SPI0_OFFSET: usize = 0x20_4000;

/// Peripheral base when the device tree does not say otherwise (BCM2711).
pub const DEFAULT_PERIPHERAL_BASE: usize = 0xFE00_0000;

/// Bytes to map: everything up to and including the SPI0 register page.
const MAP_LEN: usize = SPI0_OFFSET + 0x1000;

/// A 32-bit register file addressed by byte offset.
///
/// The production implementation is a view into the `/dev/mem` mapping;
/// tests substitute fake backends that model the hardware's status bits.
pub trait RegisterBlock {
    /// Volatile 32-bit read of the register at `offset` bytes.
    fn read(&self, offset: usize) -> u32;
    /// Volatile 32-bit write of the register at `offset` bytes.
    fn write(&self, offset: usize, value: u32);
}

/// A register file view into the live peripheral mapping.
pub struct MappedBlock {
    base: usize,
}

impl MappedBlock {
    /// # Safety
    /// `base` must point at a mapped, 4-byte-aligned register file that
    /// stays mapped for the lifetime of this view.
    pub(crate) const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl RegisterBlock for MappedBlock {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        unsafe { std::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        unsafe { std::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

/// Discover the peripheral physical base from the device tree.
///
/// `/proc/device-tree/soc/ranges` holds big-endian cells; the peripheral
/// bus address sits in the second cell on older SoCs and the third on
/// BCM2711's three-cell layout (where the second cell reads zero).
pub fn peripheral_base() -> usize {
    match fs::read("/proc/device-tree/soc/ranges") {
        Ok(ranges) => parse_soc_ranges(&ranges).unwrap_or(DEFAULT_PERIPHERAL_BASE),
        Err(_) => DEFAULT_PERIPHERAL_BASE,
    }
}

fn parse_soc_ranges(ranges: &[u8]) -> Option<usize> {
    if ranges.len() < 8 {
        return None;
    }
    let second = BigEndian::read_u32(&ranges[4..8]);
    if second != 0 {
        return Some(second as usize);
    }
    if ranges.len() >= 12 {
        let third = BigEndian::read_u32(&ranges[8..12]);
        if third != 0 {
            return Some(third as usize);
        }
    }
    None
}

/// The process-wide peripheral mapping.
///
/// Created once at driver init, released exactly once at shutdown (dropping
/// it unmaps; an explicit extra [`close`](Self::close) is a no-op).
#[cfg(unix)]
pub struct PeripheralMap {
    mem: Option<*mut libc::c_void>,
    phys: usize,
}

#[cfg(unix)]
impl PeripheralMap {
    /// Map the peripheral window from `/dev/mem`.
    ///
    /// Fails with [`MappingError::DeviceOpen`] when the device cannot be
    /// opened (typically insufficient privilege) and
    /// [`MappingError::Map`] when the map syscall fails.
    pub fn open() -> Result<Self, MappingError> {
        const DEV_MEM: &str = "/dev/mem";
        let phys = peripheral_base();

        let fd = unsafe {
            libc::open(
                b"/dev/mem\0".as_ptr() as *const libc::c_char,
                libc::O_RDWR | libc::O_SYNC,
            )
        };
        if fd < 0 {
            return Err(MappingError::DeviceOpen {
                path: DEV_MEM,
                source: io::Error::last_os_error(),
            });
        }

        let mem = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                MAP_LEN,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                phys as libc::off_t,
            )
        };
        // The mapping keeps its own reference to the device.
        unsafe { libc::close(fd) };

        if mem == libc::MAP_FAILED {
            return Err(MappingError::Map {
                phys,
                len: MAP_LEN,
                source: io::Error::last_os_error(),
            });
        }

        debug!("mapped peripherals: phys {phys:#x}, {MAP_LEN:#x} bytes");
        Ok(Self {
            mem: Some(mem),
            phys,
        })
    }

    /// The physical base this mapping covers.
    pub fn physical_base(&self) -> usize {
        self.phys
    }

    /// View of the SPI0 register file.
    ///
    /// The returned view aliases this mapping and must be dropped before it.
    pub fn spi(&self) -> MappedBlock {
        unsafe { MappedBlock::new(self.virt_base() + SPI0_OFFSET) }
    }

    /// View of the GPIO register file.
    pub fn gpio(&self) -> MappedBlock {
        unsafe { MappedBlock::new(self.virt_base() + GPIO_OFFSET) }
    }

    fn virt_base(&self) -> usize {
        // Views are only handed out while the mapping is live.
        self.mem.map(|m| m as usize).unwrap_or(0)
    }

    /// Unmap the peripheral window. Calling this twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mem) = self.mem.take() {
            unsafe { libc::munmap(mem, MAP_LEN) };
            debug!("unmapped peripherals at phys {:#x}", self.phys);
        }
    }
}

#[cfg(unix)]
impl Drop for PeripheralMap {
    fn drop(&mut self) {
        self.close();
    }
}
