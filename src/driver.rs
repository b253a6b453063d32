//! Driver facade exposed to the windowing layer.
//!
//! [`Driver::init_display`] replaces the old global register pointers with
//! an owned state object: it maps the peripherals, brings the panel up and
//! hands back the only handle through which updates may flow. The design
//! assumes a single caller; the surrounding windowing layer serializes all
//! calls into this driver.

use log::{trace, warn};

use crate::config::{PanelConfig, SPI_BUS_PINS};
use crate::display::blit::{blit_frame, Rect, SurfaceView};
use crate::display::st7789::Panel;
use crate::error::DriverError;
use crate::hal::gpio::Gpio;
use crate::hal::mmio::RegisterBlock;
#[cfg(unix)]
use crate::hal::mmio::{MappedBlock, PeripheralMap};
use crate::hal::spi::SpiBus;

/// An initialized panel plus the peripheral mapping that backs it.
pub struct Driver<S: RegisterBlock, G: RegisterBlock> {
    panel: Panel<S, G>,
    #[cfg(unix)]
    map: Option<PeripheralMap>,
}

#[cfg(unix)]
impl Driver<MappedBlock, MappedBlock> {
    /// Map the SoC peripherals, reset and configure the panel, clear it and
    /// power it on. Call exactly once before any [`update`](Self::update).
    pub fn init_display(config: PanelConfig) -> Result<Self, DriverError> {
        let map = PeripheralMap::open()?;
        let bus = SpiBus::new(map.spi(), Gpio::new(map.gpio()), config.dc_pin);
        bus.init(&SPI_BUS_PINS, config.clock_divisor)?;
        let panel = Panel::new(bus, config);
        panel.init()?;
        Ok(Self {
            panel,
            map: Some(map),
        })
    }
}

impl<S: RegisterBlock, G: RegisterBlock> Driver<S, G> {
    /// Bring the panel up on caller-supplied register backends. This is the
    /// seam the deterministic tests drive their fakes through; on hardware,
    /// prefer [`Driver::init_display`].
    pub fn with_backend(spi: S, gpio: G, config: PanelConfig) -> Result<Self, DriverError> {
        let bus = SpiBus::new(spi, Gpio::new(gpio), config.dc_pin);
        bus.init(&SPI_BUS_PINS, config.clock_divisor)?;
        let panel = Panel::new(bus, config);
        panel.init()?;
        Ok(Self {
            panel,
            #[cfg(unix)]
            map: None,
        })
    }

    /// Redraw the panel from `surface`.
    ///
    /// `regions` is accepted for interface compatibility but the full
    /// clamped surface extent is redrawn regardless of the supplied damage
    /// rectangles. Known limitation, kept deliberately.
    pub fn update(&mut self, surface: &SurfaceView<'_>, regions: &[Rect]) -> Result<(), DriverError> {
        if !regions.is_empty() {
            trace!(
                "ignoring {} damage rectangles, redrawing full extent",
                regions.len()
            );
        }
        blit_frame(&self.panel, surface)
    }

    /// Power the panel off and release the peripheral mapping.
    pub fn shutdown(mut self) {
        if let Err(err) = self.panel.power_off() {
            warn!("panel power-off failed: {err}");
        }
        #[cfg(unix)]
        if let Some(mut map) = self.map.take() {
            map.close();
        }
    }
}
