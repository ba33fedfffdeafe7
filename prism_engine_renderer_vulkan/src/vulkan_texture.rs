/// VulkanTexture - Vulkan implementation of the Texture trait
///
/// Initial data goes through a staging buffer and a one-shot submission:
/// UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    Texture, TextureDesc, TextureInfo, TextureUsage, Buffer, BufferDesc, BufferUsage, MemoryLocation,
};
use prism_engine::{engine_bail, engine_err};
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::{GpuContext, out_of_memory};
use crate::vulkan_format::{aspect_for, format_to_vk, texture_usage_to_vk, view_aspect_for};

pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    /// Sampled view (depth aspect only for depth/stencil formats)
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    info: TextureInfo,
}

fn full_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Create a 2D view over `image`
pub(crate) fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(full_range(aspect_mask));

    unsafe {
        device.create_image_view(&create_info, None)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to create image view: {:?}", e))
    }
}

impl VulkanTexture {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("prism::vulkan", "Cannot create a {}x{} texture", desc.width, desc.height);
        }
        if let Some(data) = &desc.data {
            let expected = desc.width as u64 * desc.height as u64 * desc.format.bytes_per_pixel() as u64;
            if data.len() as u64 != expected {
                return Err(Error::InvalidResource(format!(
                    "texture data is {} bytes, {}x{} {:?} needs {}",
                    data.len(), desc.width, desc.height, desc.format, expected
                )));
            }
        }

        let format = format_to_vk(desc.format);
        let usage = texture_usage_to_vk(desc.usage, desc.data.is_some());

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create {}x{} {:?} image: {:?}",
                    desc.width, desc.height, desc.format, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "texture",
                        requirements,
                        location: gpu_allocator::MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_| out_of_memory("texture", requirements.size))
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on Drop releases the image and its memory
            let mut texture = Self {
                ctx,
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                },
            };

            if let Some(allocation) = &texture.allocation {
                texture.ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("prism::vulkan", "Failed to bind image memory: {:?}", e))?;
            }

            texture.view = create_view(&texture.ctx.device, image, format, view_aspect_for(desc.format))?;

            match &desc.data {
                Some(data) => texture.upload(data)?,
                None if desc.usage == TextureUsage::SAMPLED => texture.transition_to_sampled()?,
                // Attachments start UNDEFINED; their render pass sets the layout
                None => {}
            }

            Ok(texture)
        }
    }

    fn upload(&self, data: &[u8]) -> Result<()> {
        let staging = VulkanBuffer::new(Arc::clone(&self.ctx), &BufferDesc {
            size: data.len() as u64,
            usage: BufferUsage::TRANSFER_SRC,
            location: MemoryLocation::CpuToGpu,
        })?;
        staging.update(0, data)?;

        let aspect = aspect_for(self.info.format);
        let device = &self.ctx.device;

        self.ctx.immediate_submit(|cb| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(self.image)
                .subresource_range(full_range(aspect))
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[], &[], &[to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: view_aspect_for(self.info.format),
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D {
                    width: self.info.width,
                    height: self.info.height,
                    depth: 1,
                });

            device.cmd_copy_buffer_to_image(
                cb,
                staging.buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(self.image)
                .subresource_range(full_range(aspect))
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[], &[], &[to_shader],
            );
            Ok(())
        })
    }

    fn transition_to_sampled(&self) -> Result<()> {
        let aspect = aspect_for(self.info.format);
        let device = &self.ctx.device;

        self.ctx.immediate_submit(|cb| unsafe {
            let barrier = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(self.image)
                .subresource_range(full_range(aspect))
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier],
            );
            Ok(())
        })
    }
}

impl Texture for VulkanTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
            self.ctx.device.destroy_image(self.image, None);
        }
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut allocator) = self.ctx.allocator() {
                allocator.free(allocation).ok();
            }
        }
    }
}
