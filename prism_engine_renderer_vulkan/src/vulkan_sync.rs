/// Fences and semaphores

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::prism::render::{Fence, Semaphore};
use prism_engine::engine_err;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            ctx.device.create_fence(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create fence: {:?}", e))?
        };
        Ok(Self { ctx, fence })
    }
}

impl Fence for VulkanFence {
    fn wait(&self) -> Result<()> {
        unsafe {
            self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to wait for fence: {:?}", e))
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| engine_err!("prism::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.ctx.device.get_fence_status(self.fence)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to query fence: {:?}", e))
        }
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let semaphore = unsafe {
            ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Self { ctx, semaphore })
    }
}

impl Semaphore for VulkanSemaphore {}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Raw handle behind an engine semaphore
///
/// # Safety
/// `semaphore` must have been created by this backend.
pub(crate) unsafe fn vk_semaphore(semaphore: &dyn Semaphore) -> vk::Semaphore {
    let semaphore = &*(semaphore as *const dyn Semaphore as *const VulkanSemaphore);
    semaphore.semaphore
}

/// Raw handle behind an engine fence
///
/// # Safety
/// `fence` must have been created by this backend.
pub(crate) unsafe fn vk_fence(fence: &dyn Fence) -> vk::Fence {
    let fence = &*(fence as *const dyn Fence as *const VulkanFence);
    fence.fence
}
