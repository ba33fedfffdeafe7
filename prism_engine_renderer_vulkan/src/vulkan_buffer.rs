/// VulkanBuffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use prism_engine::prism::Result;
use prism_engine::prism::render::{Buffer, BufferDesc, MemoryLocation};
use prism_engine::{engine_bail, engine_bail_warn, engine_err};
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, out_of_memory};
use crate::vulkan_format::buffer_usage_to_vk;

pub struct VulkanBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    location: MemoryLocation,
}

impl VulkanBuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail!("prism::vulkan", "Cannot create a zero-sized buffer");
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create buffer of {} bytes: {:?}", desc.size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let location = match desc.location {
                MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
                MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
            };

            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "buffer",
                        requirements,
                        location,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_| out_of_memory("buffer", requirements.size))
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.device.destroy_buffer(buffer, None);
                if let Ok(mut allocator) = ctx.allocator() {
                    allocator.free(allocation).ok();
                }
                engine_bail!("prism::vulkan", "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size: desc.size,
                location: desc.location,
            })
        }
    }
}

impl Buffer for VulkanBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.location != MemoryLocation::CpuToGpu {
            engine_bail_warn!("prism::vulkan", "Buffer update on GPU-only memory");
        }
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_bail_warn!("prism::vulkan",
                "Buffer update out of range: offset {} + {} bytes > size {}",
                offset, data.len(), self.size);
        }

        let mapped = self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| engine_err!("prism::vulkan", "Buffer memory is not mapped"))?;

        unsafe {
            let dst = (mapped.as_ptr() as *mut u8).add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            if let Ok(mut allocator) = self.ctx.allocator() {
                allocator.free(allocation).ok();
            }
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
