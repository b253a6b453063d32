//! Display protocol and the blit pipeline feeding it.

pub mod blit;
pub mod st7789;

pub use blit::{blit_frame, pack_rgb565, Rect, SurfaceView, STAGING_CAPACITY};
pub use st7789::Panel;
