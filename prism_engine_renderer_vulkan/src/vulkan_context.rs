/// GpuContext - shared Vulkan state behind every backend object
///
/// Every resource (textures, buffers, pipelines, command lists, swapchains)
/// holds an `Arc<GpuContext>`, so the logical device and instance are
/// destroyed only after the last object using them is gone.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::QueueType;
use prism_engine::{engine_debug, engine_err};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// A device queue and the family it belongs to
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueInfo {
    pub(crate) queue: vk::Queue,
    pub(crate) family: u32,
}

pub(crate) struct GpuContext {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) graphics: QueueInfo,
    /// Same as `graphics` when the device has no dedicated compute family
    pub(crate) compute: QueueInfo,
    pub(crate) present: QueueInfo,

    /// Dropped before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Serializes vkQueueSubmit / vkQueuePresentKHR across threads
    queue_lock: Mutex<()>,

    /// Reusable pool for one-shot uploads (TRANSIENT + RESET_COMMAND_BUFFER)
    upload_command_pool: Mutex<vk::CommandPool>,

    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        graphics: QueueInfo,
        compute: QueueInfo,
        present: QueueInfo,
        allocator: Allocator,
        upload_command_pool: vk::CommandPool,
        debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) -> Self {
        Self {
            entry,
            instance,
            physical_device,
            device,
            graphics,
            compute,
            present,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue_lock: Mutex::new(()),
            upload_command_pool: Mutex::new(upload_command_pool),
            debug_utils,
        }
    }

    pub(crate) fn queue(&self, queue: QueueType) -> QueueInfo {
        match queue {
            QueueType::Graphics => self.graphics,
            QueueType::Compute => self.compute,
        }
    }

    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!("prism::vulkan", "GPU allocator lock poisoned"))
    }

    pub(crate) fn lock_queues(&self) -> Result<MutexGuard<'_, ()>> {
        self.queue_lock
            .lock()
            .map_err(|_| engine_err!("prism::vulkan", "Queue lock poisoned"))
    }

    /// Record commands into a one-shot buffer, submit them on the graphics
    /// queue and block until they complete
    pub(crate) fn immediate_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<()>,
    {
        let pool = self.upload_command_pool
            .lock()
            .map_err(|_| engine_err!("prism::vulkan", "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

            let result = self.record_and_wait(command_buffer, record);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn record_and_wait<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<()>,
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device.begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

        record(command_buffer)?;

        self.device.end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to end upload command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        let _queues = self.lock_queues()?;
        self.device.queue_submit(self.graphics.queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!("prism::vulkan", "Failed to submit upload: {:?}", e))?;
        self.device.queue_wait_idle(self.graphics.queue)
            .map_err(|e| engine_err!("prism::vulkan", "Failed to wait for upload completion: {:?}", e))
    }
}

/// Map a Vulkan allocation failure to the engine error
pub(crate) fn out_of_memory(what: &str, size: u64) -> Error {
    let size_mb = size as f64 / (1024.0 * 1024.0);
    prism_engine::engine_error!("prism::vulkan", "Out of GPU memory for {} ({:.2} MB)", what, size_mb);
    Error::OutOfMemory
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Allocator pages must be freed while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            crate::debug::cleanup_debug_config();
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        engine_debug!("prism::vulkan", "Vulkan device destroyed");
    }
}
