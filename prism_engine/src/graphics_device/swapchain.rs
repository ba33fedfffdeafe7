/// Swapchain trait - window presentation
///
/// Out-of-date and suboptimal results are statuses, not errors. The caller
/// recovers by recreating the swapchain.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{CommandList, Semaphore, Texture, TextureFormat};

/// Result of `Swapchain::acquire_next_image`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired; `suboptimal` asks for a recreate after this frame
    Acquired { index: u32, suboptimal: bool },
    /// Surface changed, nothing acquired
    OutOfDate,
}

/// Result of `Swapchain::present`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
///
/// Image-available semaphores rotate per acquire. Render-finished semaphores
/// are owned per image.
pub trait Swapchain: Send + Sync {
    /// Acquire the next presentable image
    ///
    /// Signals `image_available_semaphore()` when the image is ready.
    fn acquire_next_image(&mut self) -> Result<AcquireOutcome>;

    /// Semaphore signaled by the most recent acquire
    fn image_available_semaphore(&self) -> Arc<dyn Semaphore>;

    /// Semaphore the present of image `index` waits on
    fn render_finished_semaphore(&self, index: u32) -> Arc<dyn Semaphore>;

    /// Record a blit from the final rendered texture to a swapchain image
    ///
    /// Transitions the swapchain image to present layout. Must be called
    /// while the command list is recording and outside a render pass.
    fn record_present_blit(
        &self,
        cmd: &mut dyn CommandList,
        src: &dyn Texture,
        image_index: u32,
    ) -> Result<()>;

    /// Present image `image_index`
    fn present(&mut self, image_index: u32) -> Result<PresentOutcome>;

    /// Recreate the swapchain (e.g., after window resize)
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    fn image_count(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}
