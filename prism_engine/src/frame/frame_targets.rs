/// Surface-sized targets rebuilt on every resize
///
/// - offscreen frame color (scene output, post-process input and output,
///   present blit source)
/// - depth (sampled read-only after the scene pass)
/// - scene pass (clear) and overlay pass (load) with their framebuffers
///
/// Images come from the transient pool and go back to it on `release`.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, RenderPass, RenderPassDesc, AttachmentDesc, Framebuffer, FramebufferDesc,
    LoadOp, StoreOp, ImageLayout, TextureFormat, Extent2D, Texture,
};
use crate::transient::{TransientImage, TransientImagePool};
use crate::frame::FrameConfig;

pub struct FrameTargets {
    extent: Extent2D,
    color: TransientImage,
    depth: TransientImage,
    scene_pass: Arc<dyn RenderPass>,
    overlay_pass: Arc<dyn RenderPass>,
    scene_framebuffer: Arc<dyn Framebuffer>,
    overlay_framebuffer: Arc<dyn Framebuffer>,
}

/// Scene pass: clear color and depth; depth ends read-only for sampling
pub fn scene_pass_desc(color_format: TextureFormat, depth_format: TextureFormat) -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: vec![AttachmentDesc::color_clear(color_format)],
        depth_attachment: Some(AttachmentDesc {
            format: depth_format,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::DepthStencilReadOnly,
        }),
    }
}

/// Overlay pass: draw on top of the finished frame color
pub fn overlay_pass_desc(color_format: TextureFormat) -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: vec![AttachmentDesc::color_load(color_format)],
        depth_attachment: None,
    }
}

impl FrameTargets {
    pub fn create(
        device: &dyn GraphicsDevice,
        pool: &mut TransientImagePool,
        extent: Extent2D,
        config: &FrameConfig,
    ) -> Result<Self> {
        let color = pool.acquire(device, extent, config.color_format)?;
        let depth = match pool.acquire(device, extent, config.depth_format) {
            Ok(depth) => depth,
            Err(e) => {
                pool.release(color);
                return Err(e);
            }
        };

        let passes = Self::create_passes(device, &color, &depth, extent, config);
        match passes {
            Ok((scene_pass, overlay_pass, scene_framebuffer, overlay_framebuffer)) => Ok(Self {
                extent,
                color,
                depth,
                scene_pass,
                overlay_pass,
                scene_framebuffer,
                overlay_framebuffer,
            }),
            Err(e) => {
                pool.release(color);
                pool.release(depth);
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn create_passes(
        device: &dyn GraphicsDevice,
        color: &TransientImage,
        depth: &TransientImage,
        extent: Extent2D,
        config: &FrameConfig,
    ) -> Result<(Arc<dyn RenderPass>, Arc<dyn RenderPass>, Arc<dyn Framebuffer>, Arc<dyn Framebuffer>)> {
        let scene_pass = device.create_render_pass(&scene_pass_desc(config.color_format, config.depth_format))?;
        let overlay_pass = device.create_render_pass(&overlay_pass_desc(config.color_format))?;

        let scene_framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: &scene_pass,
            color_attachments: vec![color.render_target().clone()],
            depth_stencil_attachment: Some(depth.render_target().clone()),
            width: extent.width,
            height: extent.height,
        })?;
        let overlay_framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: &overlay_pass,
            color_attachments: vec![color.render_target().clone()],
            depth_stencil_attachment: None,
            width: extent.width,
            height: extent.height,
        })?;
        Ok((scene_pass, overlay_pass, scene_framebuffer, overlay_framebuffer))
    }

    /// Hand the images back to `pool`; framebuffers and passes are dropped
    pub fn release(self, pool: &mut TransientImagePool) {
        pool.release(self.color);
        pool.release(self.depth);
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn color(&self) -> &TransientImage {
        &self.color
    }

    pub fn color_texture(&self) -> &Arc<dyn Texture> {
        self.color.texture()
    }

    pub fn depth(&self) -> &TransientImage {
        &self.depth
    }

    pub fn scene_pass(&self) -> &Arc<dyn RenderPass> {
        &self.scene_pass
    }

    pub fn overlay_pass(&self) -> &Arc<dyn RenderPass> {
        &self.overlay_pass
    }

    pub fn scene_framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.scene_framebuffer
    }

    pub fn overlay_framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.overlay_framebuffer
    }
}
