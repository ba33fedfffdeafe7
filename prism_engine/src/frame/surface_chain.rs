/// Presentation surface wrapper
///
/// Turns out-of-date and suboptimal statuses into a rebuild flag. Resize
/// requests are recorded and only applied by `rebuild`, between draws.

use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Swapchain, AcquireOutcome, PresentOutcome, Extent2D,
};
use crate::{engine_debug, engine_info};

pub struct SurfaceChain {
    swapchain: Box<dyn Swapchain>,
    needs_rebuild: bool,
    pending_extent: Option<Extent2D>,
}

impl SurfaceChain {
    pub fn new(swapchain: Box<dyn Swapchain>) -> Self {
        Self {
            swapchain,
            needs_rebuild: false,
            pending_extent: None,
        }
    }

    /// Acquire the next image; `None` when the surface is out of date
    pub fn acquire(&mut self) -> Result<Option<u32>> {
        match self.swapchain.acquire_next_image()? {
            AcquireOutcome::Acquired { index, suboptimal } => {
                if suboptimal {
                    engine_debug!("prism::SurfaceChain", "acquire suboptimal, rebuild after frame");
                    self.needs_rebuild = true;
                }
                Ok(Some(index))
            }
            AcquireOutcome::OutOfDate => {
                engine_debug!("prism::SurfaceChain", "acquire out of date");
                self.needs_rebuild = true;
                Ok(None)
            }
        }
    }

    /// Present `index`; returns true when the surface must be rebuilt
    pub fn present(&mut self, index: u32) -> Result<bool> {
        match self.swapchain.present(index)? {
            PresentOutcome::Presented => {}
            PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => self.needs_rebuild = true,
        }
        Ok(self.needs_rebuild())
    }

    /// Record a new window extent, applied by the next `rebuild`
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending_extent = Some(Extent2D::new(width, height));
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild || self.pending_extent.is_some()
    }

    /// Extent the next rebuild will use
    pub fn target_extent(&self) -> Extent2D {
        self.pending_extent.unwrap_or_else(|| self.extent())
    }

    /// Idle the device, recreate the swapchain, clear the flag
    pub fn rebuild(&mut self, device: &dyn GraphicsDevice) -> Result<Extent2D> {
        let extent = self.target_extent();
        device.wait_idle()?;
        self.swapchain.recreate(extent.width, extent.height)?;
        self.needs_rebuild = false;
        self.pending_extent = None;
        engine_info!("prism::SurfaceChain", "surface rebuilt at {}x{}", self.swapchain.width(), self.swapchain.height());
        Ok(self.extent())
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.swapchain.width(), self.swapchain.height())
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn swapchain_mut(&mut self) -> &mut dyn Swapchain {
        self.swapchain.as_mut()
    }
}

#[cfg(test)]
#[path = "surface_chain_tests.rs"]
mod tests;
