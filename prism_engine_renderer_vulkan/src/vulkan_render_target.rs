/// VulkanRenderTarget - attachment view over a texture
///
/// Depth/stencil targets view both aspects; the texture's own view is
/// depth-only for sampling.

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::prism::render::{RenderTarget, Texture, TextureFormat, TextureUsage};
use prism_engine::engine_bail;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_for, format_to_vk};
use crate::vulkan_texture::{create_view, VulkanTexture};

pub struct VulkanRenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) view: vk::ImageView,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl VulkanRenderTarget {
    pub(crate) fn new(ctx: Arc<GpuContext>, texture: &VulkanTexture) -> Result<Self> {
        let info = texture.info();
        let attachable = TextureUsage::COLOR_ATTACHMENT | TextureUsage::DEPTH_ATTACHMENT;
        if !info.usage.intersects(attachable) {
            engine_bail!("prism::vulkan", "Texture {}x{} {:?} has no attachment usage",
                info.width, info.height, info.format);
        }

        let view = create_view(&ctx.device, texture.image, format_to_vk(info.format), aspect_for(info.format))?;
        Ok(Self {
            ctx,
            view,
            width: info.width,
            height: info.height,
            format: info.format,
        })
    }
}

impl RenderTarget for VulkanRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for VulkanRenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
        }
    }
}
