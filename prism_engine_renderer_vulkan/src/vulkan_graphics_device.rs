/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the shared GpuContext and the descriptor arena. Every object it
/// creates keeps the context alive, so the device can be dropped before the
/// resources it made.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    GraphicsDevice, DeviceStats, QueueType, SubmitInfo, Config, ValidationStats,
    Buffer, BufferDesc, Texture, TextureDesc, Shader, ShaderDesc,
    Pipeline, PipelineDesc, ComputePipelineDesc,
    RenderPass, RenderPassDesc, RenderTarget, Framebuffer, FramebufferDesc,
    BindingGroup, BindingResource, CommandList, Fence, Semaphore,
};
use prism_engine::{engine_bail, engine_err, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::vulkan_binding_group::{DescriptorArena, VulkanBindingGroup};
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::{GpuContext, QueueInfo};
use crate::vulkan_format::stages_to_vk;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_render_target::VulkanRenderTarget;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::VulkanShader;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_sync::{vk_fence, vk_semaphore, VulkanFence, VulkanSemaphore};
use crate::vulkan_texture::VulkanTexture;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Queue family indices picked for a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    pub graphics: u32,
    pub compute: u32,
    pub present: u32,
}

/// Pick graphics, compute and present families
///
/// The compute family is a COMPUTE-without-GRAPHICS family when
/// `prefer_async_compute` is set and one exists, the graphics family
/// otherwise. Present prefers the graphics family.
pub(crate) fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    prefer_async_compute: bool,
    can_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let has = |props: &vk::QueueFamilyProperties, flags: vk::QueueFlags| {
        props.queue_count > 0 && props.queue_flags.contains(flags)
    };

    let graphics = families
        .iter()
        .position(|props| has(props, vk::QueueFlags::GRAPHICS))? as u32;

    let present = if can_present(graphics) {
        graphics
    } else {
        (0..families.len() as u32).find(|&i| can_present(i))?
    };

    let dedicated_compute = families
        .iter()
        .position(|props| has(props, vk::QueueFlags::COMPUTE) && !props.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32);
    let compute = match dedicated_compute {
        Some(family) if prefer_async_compute => family,
        _ => graphics,
    };

    Some(QueueFamilies { graphics, compute, present })
}

/// Discrete GPUs first, then integrated, then anything else
fn device_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        _ => 3,
    }
}

/// Distinct family indices, in order of first appearance
fn unique_families(families: &QueueFamilies) -> Vec<u32> {
    let mut unique = Vec::with_capacity(3);
    for family in [families.graphics, families.compute, families.present] {
        if !unique.contains(&family) {
            unique.push(family);
        }
    }
    unique
}

#[derive(Default)]
struct StatsCounters {
    buffers: AtomicU32,
    textures: AtomicU32,
    pipelines: AtomicU32,
    submits: AtomicU32,
}

pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    descriptors: Arc<DescriptorArena>,
    config: Config,
    device_name: String,
    stats: StatsCounters,
}

unsafe fn destroy_instance(
    instance: &ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
) {
    crate::debug::cleanup_debug_config();
    if let Some((loader, messenger)) = debug_utils {
        loader.destroy_debug_utils_messenger(messenger, None);
    }
    instance.destroy_instance(None);
}

impl VulkanGraphicsDevice {
    /// Create the instance, pick a GPU and create the logical device
    ///
    /// `window` is used to find the instance extensions and a queue family
    /// that can present to it.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("prism::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let validation = Self::validation_available(&entry, &config);
            let instance = Self::create_instance(&entry, window, &config, validation)?;

            let debug_utils = if validation {
                match Self::create_messenger(&entry, &instance, &config) {
                    Ok(debug_utils) => Some(debug_utils),
                    Err(e) => {
                        destroy_instance(&instance, None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            let (physical_device, families) = match Self::pick_physical_device(&entry, &instance, window, &config) {
                Ok(picked) => picked,
                Err(e) => {
                    destroy_instance(&instance, debug_utils);
                    return Err(e);
                }
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties.device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown GPU".to_string());
            let features = instance.get_physical_device_features(physical_device);
            let anisotropy = features.sampler_anisotropy == vk::TRUE;

            let device = match Self::create_device(&instance, physical_device, &families, anisotropy) {
                Ok(device) => device,
                Err(e) => {
                    destroy_instance(&instance, debug_utils);
                    return Err(e);
                }
            };

            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = match device.create_command_pool(&upload_pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    device.destroy_device(None);
                    destroy_instance(&instance, debug_utils);
                    return Err(Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e)));
                }
            };

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            });
            let allocator = match allocator {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_command_pool(upload_command_pool, None);
                    device.destroy_device(None);
                    destroy_instance(&instance, debug_utils);
                    return Err(Error::InitializationFailed(format!("Failed to create GPU allocator: {:?}", e)));
                }
            };

            let queue = |family: u32| QueueInfo { queue: device.get_device_queue(family, 0), family };
            let (graphics, compute, present) = (queue(families.graphics), queue(families.compute), queue(families.present));

            // From here on GpuContext owns device and instance teardown
            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                graphics,
                compute,
                present,
                allocator,
                upload_command_pool,
                debug_utils,
            ));

            let max_anisotropy = if anisotropy { properties.limits.max_sampler_anisotropy } else { 0.0 };
            let samplers = SamplerCache::new(Arc::clone(&ctx), max_anisotropy);
            let descriptors = Arc::new(DescriptorArena::new(Arc::clone(&ctx), samplers)?);

            engine_info!("prism::vulkan", "Device '{}' ready (graphics family {}, compute family {}, present family {}, validation {})",
                device_name, families.graphics, families.compute, families.present, validation);

            Ok(Self {
                ctx,
                descriptors,
                config,
                device_name,
                stats: StatsCounters::default(),
            })
        }
    }

    /// Validation needs both the config flag and the `vulkan-validation` feature
    unsafe fn validation_available(entry: &ash::Entry, config: &Config) -> bool {
        if !config.enable_validation {
            return false;
        }
        if !cfg!(feature = "vulkan-validation") {
            engine_warn!("prism::vulkan",
                "Validation requested but the crate was built without the vulkan-validation feature");
            return false;
        }

        let layers = entry.enumerate_instance_layer_properties().unwrap_or_default();
        let found = layers.iter().any(|layer| {
            layer.layer_name_as_c_str().map(|name| name == VALIDATION_LAYER).unwrap_or(false)
        });
        if !found {
            engine_warn!("prism::vulkan", "{:?} not installed, validation disabled", VALIDATION_LAYER);
        }
        found
    }

    unsafe fn create_instance<W: HasDisplayHandle>(
        entry: &ash::Entry,
        window: &W,
        config: &Config,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = std::ffi::CString::new(config.app_name.as_str())
            .unwrap_or_else(|_| c"Prism Application".to_owned());

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Prism")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let display_handle = window.display_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get display handle: {}", e)))?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| Error::InitializationFailed(format!("Failed to get required extensions: {}", e)))?
            .to_vec();

        let mut layer_names = Vec::new();
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            layer_names.push(VALIDATION_LAYER.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry.create_instance(&create_info, None)
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })
    }

    unsafe fn create_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        crate::debug::init_debug_config(crate::debug::Config {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        });

        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils.create_debug_utils_messenger(&create_info, None)
            .map_err(|e| {
                crate::debug::cleanup_debug_config();
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;
        Ok((debug_utils, messenger))
    }

    /// Best-ranked GPU with a graphics family that can present to `window`
    unsafe fn pick_physical_device<W: HasDisplayHandle + HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
        config: &Config,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let display_handle = window.display_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get display handle: {}", e)))?;
        let window_handle = window.window_handle()
            .map_err(|e| Error::InitializationFailed(format!("Failed to get window handle: {}", e)))?;

        // Temporary surface, only for present support queries
        let surface_loader = ash::khr::surface::Instance::new(entry, instance);
        let surface = ash_window::create_surface(entry, instance, display_handle.as_raw(), window_handle.as_raw(), None)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create surface: {:?}", e)))?;

        let physical_devices = instance.enumerate_physical_devices().unwrap_or_default();
        let mut candidates: Vec<(u32, vk::PhysicalDevice, QueueFamilies)> = physical_devices
            .into_iter()
            .filter_map(|physical_device| {
                let families = instance.get_physical_device_queue_family_properties(physical_device);
                let selected = select_queue_families(&families, config.prefer_async_compute, |family| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, family, surface)
                        .unwrap_or(false)
                })?;
                let device_type = instance.get_physical_device_properties(physical_device).device_type;
                Some((device_rank(device_type), physical_device, selected))
            })
            .collect();

        surface_loader.destroy_surface(surface, None);

        candidates.sort_by_key(|(rank, _, _)| *rank);
        candidates
            .into_iter()
            .next()
            .map(|(_, physical_device, families)| (physical_device, families))
            .ok_or_else(|| {
                engine_error!("prism::vulkan", "No Vulkan GPU can render and present to this window");
                Error::InitializationFailed("No suitable GPU found".to_string())
            })
    }

    unsafe fn create_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: &QueueFamilies,
        anisotropy: bool,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families(families)
            .into_iter()
            .map(|family| vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities))
            .collect();

        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(anisotropy);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        instance.create_device(physical_device, &create_info, None)
            .map_err(|e| {
                engine_error!("prism::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })
    }

    /// Create a swapchain for `window`, sized to its inner size
    pub fn create_swapchain(&self, window: &winit::window::Window) -> Result<VulkanSwapchain> {
        let size = window.inner_size();
        VulkanSwapchain::new(Arc::clone(&self.ctx), window, self.config.present_mode, size.width, size.height)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Validation message counters (all zero when validation is off)
    pub fn validation_stats(&self) -> ValidationStats {
        crate::debug::get_validation_stats()
    }

    fn command_buffer(cmd: &dyn CommandList) -> vk::CommandBuffer {
        unsafe { (*(cmd as *const dyn CommandList as *const VulkanCommandList)).command_buffer }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let buffer = VulkanBuffer::new(Arc::clone(&self.ctx), &desc)?;
        self.stats.buffers.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(buffer))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let texture = VulkanTexture::new(Arc::clone(&self.ctx), desc)?;
        self.stats.textures.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(texture))
    }

    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(VulkanShader::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let pipeline = VulkanPipeline::new_graphics(Arc::clone(&self.ctx), desc)?;
        self.stats.pipelines.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(pipeline))
    }

    fn create_compute_pipeline(&self, desc: ComputePipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let pipeline = VulkanPipeline::new_compute(Arc::clone(&self.ctx), desc)?;
        self.stats.pipelines.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(pipeline))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(VulkanRenderPass::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_render_target(&self, texture: &dyn Texture) -> Result<Arc<dyn RenderTarget>> {
        let texture = unsafe { &*(texture as *const dyn Texture as *const VulkanTexture) };
        Ok(Arc::new(VulkanRenderTarget::new(Arc::clone(&self.ctx), texture)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(VulkanFramebuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let group = VulkanBindingGroup::new(Arc::clone(&self.descriptors), pipeline, set_index, resources)?;
        Ok(Arc::new(group))
    }

    fn create_command_list(&self, queue: QueueType) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(VulkanCommandList::new(Arc::clone(&self.ctx), queue)?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(VulkanFence::new(Arc::clone(&self.ctx), signaled)?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(VulkanSemaphore::new(Arc::clone(&self.ctx))?))
    }

    fn submit(&self, info: &SubmitInfo) -> Result<()> {
        if let Some(cmd) = info.command_lists.iter().find(|cmd| cmd.queue() != info.queue) {
            engine_bail!("prism::vulkan", "Command list recorded for {:?} submitted to {:?}", cmd.queue(), info.queue);
        }

        let command_buffers: Vec<vk::CommandBuffer> = info.command_lists
            .iter()
            .map(|cmd| Self::command_buffer(*cmd))
            .collect();
        let (wait_semaphores, wait_stages): (Vec<vk::Semaphore>, Vec<vk::PipelineStageFlags>) = info.wait
            .iter()
            .map(|(semaphore, stage)| (unsafe { vk_semaphore(*semaphore) }, stages_to_vk(*stage)))
            .unzip();
        let signal_semaphores: Vec<vk::Semaphore> = info.signal
            .iter()
            .map(|semaphore| unsafe { vk_semaphore(*semaphore) })
            .collect();
        let fence = info.fence.map(|fence| unsafe { vk_fence(fence) }).unwrap_or(vk::Fence::null());

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let queue = self.ctx.queue(info.queue).queue;
        {
            let _queues = self.ctx.lock_queues()?;
            unsafe {
                self.ctx.device.queue_submit(queue, &[submit_info], fence)
                    .map_err(|e| match e {
                        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                            engine_error!("prism::vulkan", "Out of memory during {:?} submit", info.queue);
                            Error::OutOfMemory
                        }
                        e => engine_err!("prism::vulkan", "Failed to submit to {:?} queue: {:?}", info.queue, e),
                    })?;
            }
        }

        self.stats.submits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn submit_and_wait(&self, queue: QueueType, command_lists: &[&dyn CommandList]) -> Result<()> {
        let fence = VulkanFence::new(Arc::clone(&self.ctx), false)?;
        self.submit(&SubmitInfo {
            queue,
            command_lists,
            wait: &[],
            signal: &[],
            fence: Some(&fence),
        })?;
        fence.wait()
    }

    fn queue_family_index(&self, queue: QueueType) -> u32 {
        self.ctx.queue(queue).family
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("prism::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            buffers: self.stats.buffers.load(Ordering::Relaxed),
            textures: self.stats.textures.load(Ordering::Relaxed),
            pipelines: self.stats.pipelines.load(Ordering::Relaxed),
            submits: self.stats.submits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_graphics_device_tests.rs"]
mod tests;
