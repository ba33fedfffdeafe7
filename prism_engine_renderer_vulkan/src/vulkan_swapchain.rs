/// VulkanSwapchain - window surface, swapchain images and present semaphores
///
/// Frames reach the swapchain through a blit, so images are created with
/// TRANSFER_DST usage and never get views. Image-available semaphores rotate
/// per acquire (one more than the image count); render-finished semaphores
/// belong to an image.

use ash::vk;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    Swapchain, AcquireOutcome, PresentOutcome, PresentMode, CommandList, Semaphore, Texture, TextureFormat,
};
use prism_engine::{engine_bail, engine_debug, engine_err, engine_warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{present_mode_to_vk, vk_format_to_format};
use crate::vulkan_sync::VulkanSemaphore;
use crate::vulkan_texture::VulkanTexture;

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

const COLOR_LAYERS: vk::ImageSubresourceLayers = vk::ImageSubresourceLayers {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    mip_level: 0,
    base_array_layer: 0,
    layer_count: 1,
};

pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,

    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,

    image_available: Vec<Arc<VulkanSemaphore>>,
    /// Slot signaled by the most recent successful acquire
    current_slot: usize,
    next_slot: usize,
    render_finished: Vec<Arc<VulkanSemaphore>>,
}

/// Preferred surface format: BGRA sRGB, then BGRA UNORM, then anything the
/// engine has a format for
pub(crate) fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<(vk::SurfaceFormatKHR, TextureFormat)> {
    let preferred = [vk::Format::B8G8R8A8_SRGB, vk::Format::B8G8R8A8_UNORM];

    preferred
        .iter()
        .find_map(|wanted| available.iter().find(|f| f.format == *wanted))
        .or_else(|| available.iter().find(|f| vk_format_to_format(f.format).is_some()))
        .and_then(|f| vk_format_to_format(f.format).map(|format| (*f, format)))
        .ok_or_else(|| Error::UnsupportedFormat(format!(
            "no usable surface format among {:?}",
            available.iter().map(|f| f.format).collect::<Vec<_>>()
        )))
}

/// Requested present mode if supported, FIFO otherwise
pub(crate) fn choose_present_mode(requested: PresentMode, available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    let wanted = present_mode_to_vk(requested);
    if available.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the requested size clamped to the surface limits when
/// the surface leaves it to the swapchain
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image more than the minimum, within the surface maximum (0 = none)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

impl VulkanSwapchain {
    pub(crate) fn new<W: HasDisplayHandle + HasWindowHandle>(
        ctx: Arc<GpuContext>,
        window: &W,
        present_mode: PresentMode,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let display = window.display_handle()
            .map_err(|e| Error::InitializationFailed(format!("No display handle: {}", e)))?;
        let window_handle = window.window_handle()
            .map_err(|e| Error::InitializationFailed(format!("No window handle: {}", e)))?;

        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let surface = unsafe {
            ash_window::create_surface(&ctx.entry, &ctx.instance, display.as_raw(), window_handle.as_raw(), None)
                .map_err(|e| Error::InitializationFailed(format!("Failed to create window surface: {:?}", e)))?
        };

        let supported = unsafe {
            surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.present.family, surface)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { surface_loader.destroy_surface(surface, None); }
            return Err(Error::InitializationFailed(
                "Present queue family cannot present to this window".to_string(),
            ));
        }

        let (surface_format, format, available_modes) = unsafe {
            let formats = surface_loader.get_physical_device_surface_formats(ctx.physical_device, surface);
            let modes = surface_loader.get_physical_device_surface_present_modes(ctx.physical_device, surface);
            match (formats, modes) {
                (Ok(formats), Ok(modes)) => match choose_surface_format(&formats) {
                    Ok((surface_format, format)) => (surface_format, format, modes),
                    Err(e) => {
                        surface_loader.destroy_surface(surface, None);
                        return Err(e);
                    }
                },
                (Err(e), _) | (_, Err(e)) => {
                    surface_loader.destroy_surface(surface, None);
                    return Err(Error::InitializationFailed(format!("Failed to query surface: {:?}", e)));
                }
            }
        };

        let chosen_mode = choose_present_mode(present_mode, &available_modes);
        if chosen_mode != present_mode_to_vk(present_mode) {
            engine_warn!("prism::vulkan", "Present mode {:?} unsupported, using FIFO", present_mode);
        }

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        // From here on Drop releases the surface and whatever else exists
        let mut swapchain = Self {
            ctx,
            surface_loader,
            surface,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            surface_format,
            format,
            extent: vk::Extent2D { width: 0, height: 0 },
            present_mode: chosen_mode,
            image_available: Vec::new(),
            current_slot: 0,
            next_slot: 0,
            render_finished: Vec::new(),
        };
        swapchain.build(width, height)?;
        Ok(swapchain)
    }

    /// (Re)create the swapchain, its image list and its semaphores
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to get surface capabilities: {:?}", e))?
        };

        let extent = choose_extent(&capabilities, width, height);
        if extent.width == 0 || extent.height == 0 {
            engine_bail!("prism::vulkan", "Cannot create a {}x{} swapchain", extent.width, extent.height);
        }

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(choose_image_count(&capabilities))
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(self.swapchain);

        let new_swapchain = unsafe {
            self.swapchain_loader.create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create swapchain: {:?}", e))?
        };

        unsafe {
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
        self.swapchain = new_swapchain;
        self.extent = extent;

        self.images = unsafe {
            self.swapchain_loader.get_swapchain_images(self.swapchain)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to get swapchain images: {:?}", e))?
        };

        let image_count = self.images.len();
        self.render_finished = (0..image_count)
            .map(|_| VulkanSemaphore::new(Arc::clone(&self.ctx)).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        self.image_available = (0..image_count + 1)
            .map(|_| VulkanSemaphore::new(Arc::clone(&self.ctx)).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        self.current_slot = 0;
        self.next_slot = 0;

        engine_debug!("prism::vulkan", "Swapchain {}x{} {:?}, {} image(s), {:?}",
            extent.width, extent.height, self.format, image_count, self.present_mode);
        Ok(())
    }

    fn check_index(&self, image_index: u32) -> Result<usize> {
        let index = image_index as usize;
        if index >= self.images.len() {
            return Err(Error::InvalidResource(format!(
                "swapchain image {} out of range (count: {})", image_index, self.images.len()
            )));
        }
        Ok(index)
    }
}

impl Swapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self) -> Result<AcquireOutcome> {
        let slot = self.next_slot;
        let semaphore = self.image_available[slot].semaphore;

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        };

        match result {
            Ok((index, suboptimal)) => {
                self.current_slot = slot;
                self.next_slot = (slot + 1) % self.image_available.len();
                Ok(AcquireOutcome::Acquired { index, suboptimal })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(engine_err!("prism::vulkan", "Failed to acquire swapchain image: {:?}", e)),
        }
    }

    fn image_available_semaphore(&self) -> Arc<dyn Semaphore> {
        self.image_available[self.current_slot].clone()
    }

    fn render_finished_semaphore(&self, index: u32) -> Arc<dyn Semaphore> {
        // Out-of-range indices are caught by present
        let index = (index as usize).min(self.render_finished.len().saturating_sub(1));
        self.render_finished[index].clone()
    }

    fn record_present_blit(&self, cmd: &mut dyn CommandList, src: &dyn Texture, image_index: u32) -> Result<()> {
        let index = self.check_index(image_index)?;

        let vk_cmd = unsafe { &*(cmd as *const dyn CommandList as *const VulkanCommandList) };
        vk_cmd.require_outside_render_pass()?;

        let src_info = src.info();
        if src_info.format.is_depth() {
            engine_bail!("prism::vulkan", "Cannot present a depth texture ({:?})", src_info.format);
        }
        let src_image = unsafe { (*(src as *const dyn Texture as *const VulkanTexture)).image };
        let dst_image = self.images[index];
        let cb = vk_cmd.command_buffer;
        let device = &self.ctx.device;

        let to_transfer = [
            vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(src_image)
                .subresource_range(COLOR_RANGE)
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                .dst_access_mask(vk::AccessFlags::TRANSFER_READ),
            vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(dst_image)
                .subresource_range(COLOR_RANGE)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE),
        ];

        let region = vk::ImageBlit {
            src_subresource: COLOR_LAYERS,
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: src_info.width as i32, y: src_info.height as i32, z: 1 },
            ],
            dst_subresource: COLOR_LAYERS,
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: self.extent.width as i32, y: self.extent.height as i32, z: 1 },
            ],
        };

        let to_present = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(dst_image)
            .subresource_range(COLOR_RANGE)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::empty());

        unsafe {
            // The acquire semaphore is waited at COLOR_ATTACHMENT_OUTPUT, so
            // the swapchain image transition starts there too
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[], &[], &to_transfer,
            );
            device.cmd_blit_image(
                cb,
                src_image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[], &[], &[to_present],
            );
        }
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<PresentOutcome> {
        let index = self.check_index(image_index)?;

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [self.render_finished[index].semaphore];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queues = self.ctx.lock_queues()?;
            unsafe { self.swapchain_loader.queue_present(self.ctx.present.queue, &present_info) }
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(engine_err!("prism::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("prism::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }
        self.build(width, height)
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.image_available.clear();
            self.render_finished.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
