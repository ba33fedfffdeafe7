/// VulkanFramebuffer - groups render target views for a render pass
///
/// Holds its attachments so their views outlive the VkFramebuffer.

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::prism::render::{Framebuffer, FramebufferDesc, RenderPass, RenderTarget};
use prism_engine::{engine_bail, engine_err};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_render_target::VulkanRenderTarget;

pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    _attachments: Vec<Arc<dyn RenderTarget>>,
}

fn target_view(target: &Arc<dyn RenderTarget>) -> vk::ImageView {
    let target = unsafe { &*(target.as_ref() as *const dyn RenderTarget as *const VulkanRenderTarget) };
    target.view
}

impl VulkanFramebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("prism::vulkan", "Cannot create a {}x{} framebuffer", desc.width, desc.height);
        }

        let pass_desc = desc.render_pass.desc();
        if pass_desc.color_attachments.len() != desc.color_attachments.len()
            || pass_desc.depth_attachment.is_some() != desc.depth_stencil_attachment.is_some()
        {
            engine_bail!("prism::vulkan",
                "Framebuffer attachments ({} color, depth {}) do not match the render pass ({} color, depth {})",
                desc.color_attachments.len(), desc.depth_stencil_attachment.is_some(),
                pass_desc.color_attachments.len(), pass_desc.depth_attachment.is_some());
        }

        let attachments: Vec<Arc<dyn RenderTarget>> = desc.color_attachments
            .iter()
            .chain(desc.depth_stencil_attachment.iter())
            .cloned()
            .collect();

        if let Some(small) = attachments.iter().find(|a| a.width() < desc.width || a.height() < desc.height) {
            engine_bail!("prism::vulkan", "Attachment {}x{} is smaller than framebuffer {}x{}",
                small.width(), small.height(), desc.width, desc.height);
        }

        let views: Vec<vk::ImageView> = attachments.iter().map(target_view).collect();
        let render_pass = unsafe {
            &*(desc.render_pass.as_ref() as *const dyn RenderPass as *const VulkanRenderPass)
        };

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            ctx.device.create_framebuffer(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Self {
            ctx,
            framebuffer,
            width: desc.width,
            height: desc.height,
            _attachments: attachments,
        })
    }
}

impl Framebuffer for VulkanFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
