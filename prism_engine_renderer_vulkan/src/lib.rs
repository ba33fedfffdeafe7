/*!
# Prism - Vulkan Backend

Vulkan implementation of the `prism_engine` graphics device traits, built on
ash for the bindings and gpu-allocator for memory.

Every object created by [`VulkanGraphicsDevice`] shares one reference-counted
GPU context, so resources may outlive the device handle that created them.

```no_run
use prism_engine::prism::render::Config;
use prism_engine_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> prism_engine::prism::Result<()> {
let device = VulkanGraphicsDevice::new(window, Config::default())?;
let swapchain = device.create_swapchain(window)?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_context;
mod vulkan_format;

mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_frame_buffer;
mod vulkan_binding_group;
mod vulkan_command_list;
mod vulkan_sync;
mod vulkan_swapchain;
mod vulkan_graphics_device;

pub use vulkan_graphics_device::VulkanGraphicsDevice;
pub use vulkan_swapchain::VulkanSwapchain;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
