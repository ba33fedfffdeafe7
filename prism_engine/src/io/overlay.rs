/// Overlay UI interface

use crate::error::Result;
use crate::graphics_device::{CommandList, Extent2D};

/// Draws on top of the finished frame
///
/// Called with the overlay render pass active and the viewport and scissor
/// set to `extent`.
pub trait Overlay {
    fn record(&mut self, cmd: &mut dyn CommandList, extent: Extent2D) -> Result<()>;
}

/// Overlay that draws nothing
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn record(&mut self, _cmd: &mut dyn CommandList, _extent: Extent2D) -> Result<()> {
        Ok(())
    }
}
