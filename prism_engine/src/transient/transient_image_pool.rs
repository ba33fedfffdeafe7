/// Transient image pool
///
/// Render targets whose lifetime is a frame or a graph build are recycled
/// instead of destroyed. Matching is exact on (extent, format): a request
/// that matches nothing allocates, and pooled images are never resized or
/// reformatted.
///
/// Single-threaded: every mutator takes `&mut self`.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage, RenderTarget, Extent2D,
};
use crate::{engine_debug, engine_trace};

/// Pooled render target
///
/// Not `Clone`: ownership moves to the caller on acquire and back to the
/// pool on release.
pub struct TransientImage {
    id: u64,
    extent: Extent2D,
    format: TextureFormat,
    usage: TextureUsage,
    texture: Arc<dyn Texture>,
    render_target: Arc<dyn RenderTarget>,
}

impl TransientImage {
    /// Stable identity for the lifetime of the underlying texture
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    /// Attachment view for framebuffers
    pub fn render_target(&self) -> &Arc<dyn RenderTarget> {
        &self.render_target
    }
}

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Images created since the pool was made
    pub allocations: u64,
    /// Requests served from the free list
    pub hits: u64,
    /// Images currently waiting in the free list
    pub pooled: usize,
}

/// Free list of transient images
#[derive(Default)]
pub struct TransientImagePool {
    free: Vec<TransientImage>,
    next_id: u64,
    allocations: u64,
    hits: u64,
}

impl TransientImagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an image of exactly `extent` and `format`, allocating on a miss
    pub fn acquire(
        &mut self,
        device: &dyn GraphicsDevice,
        extent: Extent2D,
        format: TextureFormat,
    ) -> Result<TransientImage> {
        if let Some(position) = self.free.iter().position(|image| image.extent == extent && image.format == format) {
            self.hits += 1;
            let image = self.free.swap_remove(position);
            engine_trace!("prism::TransientImagePool", "reuse #{} {}x{} {:?}", image.id, extent.width, extent.height, format);
            return Ok(image);
        }

        let usage = TextureUsage::for_attachment(format);
        let texture = device.create_texture(TextureDesc {
            width: extent.width,
            height: extent.height,
            format,
            usage,
            data: None,
        })?;
        let render_target = device.create_render_target(texture.as_ref())?;

        self.next_id += 1;
        self.allocations += 1;
        engine_debug!("prism::TransientImagePool", "allocate #{} {}x{} {:?}", self.next_id, extent.width, extent.height, format);
        Ok(TransientImage {
            id: self.next_id,
            extent,
            format,
            usage,
            texture,
            render_target,
        })
    }

    /// Return an image to the free list
    pub fn release(&mut self, image: TransientImage) {
        engine_trace!("prism::TransientImagePool", "release #{}", image.id);
        self.free.push(image);
    }

    /// Destroy every pooled image (surface resize)
    ///
    /// Images currently held by callers are unaffected.
    pub fn clear(&mut self) {
        if !self.free.is_empty() {
            engine_debug!("prism::TransientImagePool", "clear {} pooled images", self.free.len());
        }
        self.free.clear();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocations: self.allocations,
            hits: self.hits,
            pooled: self.free.len(),
        }
    }
}

#[cfg(test)]
#[path = "transient_image_pool_tests.rs"]
mod tests;
