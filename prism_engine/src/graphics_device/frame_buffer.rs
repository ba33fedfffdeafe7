/// Framebuffer - the attachment set one render pass writes into
///
/// Post-process passes build one framebuffer per output image and rebuild it
/// with the graph. It keeps its attachments alive.

use std::sync::Arc;
use crate::graphics_device::{RenderPass, RenderTarget};

pub trait Framebuffer: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Attachments must match the render pass in count and format and be at
/// least `width` x `height`
pub struct FramebufferDesc<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub color_attachments: Vec<Arc<dyn RenderTarget>>,
    pub depth_stencil_attachment: Option<Arc<dyn RenderTarget>>,
    pub width: u32,
    pub height: u32,
}
