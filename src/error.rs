//! Error taxonomy for the driver.
//!
//! Three kinds of failure exist (and only the first two are representable):
//!
//! - Fatal init-time failures: the peripheral device cannot be opened or
//!   mapped. Reported once via [`MappingError`]; initialization aborts.
//! - Caller-input errors: an invalid pin index or an update wider than the
//!   scanline staging buffer. Recoverable; the panel state is untouched and
//!   a subsequent valid call may proceed.
//! - Bus stalls: a non-responding panel during a polled wait has no failure
//!   signal at all and is not modeled. The poll blocks.

use thiserror::Error;

/// Failure to map the SoC peripheral window into the process.
#[derive(Debug, Error)]
pub enum MappingError {
    /// `/dev/mem` could not be opened, most commonly a privilege issue.
    #[error("cannot open {path}: {source}")]
    DeviceOpen {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The `mmap` syscall itself failed.
    #[error("mmap of {len:#x} bytes at physical {phys:#x} failed: {source}")]
    Map {
        phys: usize,
        len: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Any error the driver can report to the windowing layer.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Peripheral mapping failed during `init_display`.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A GPIO pin outside the supported 0-31 range was requested.
    #[error("invalid GPIO pin {0}: only pins 0-31 are supported")]
    InvalidPin(u8),

    /// An update would need more scanline staging space than exists.
    /// Nothing was sent to the panel.
    #[error("scanline needs {required} bytes but staging capacity is {capacity}")]
    StagingOverflow { required: usize, capacity: usize },

    /// The surface buffer does not match its declared geometry. Nothing was
    /// sent to the panel.
    #[error("surface buffer holds {len} bytes, its declared layout needs {required}")]
    SurfaceMismatch { required: usize, len: usize },
}
