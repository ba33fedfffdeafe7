/// Graphics device module - backend-agnostic GPU primitives

pub mod graphics_device;
pub mod config;
pub mod texture;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod render_pass;
pub mod render_target;
pub mod frame_buffer;
pub mod binding_group;
pub mod command_list;
pub mod barrier;
pub mod sync;
pub mod swapchain;

pub use graphics_device::*;
pub use config::*;
pub use texture::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use render_pass::*;
pub use render_target::*;
pub use frame_buffer::*;
pub use binding_group::*;
pub use command_list::*;
pub use barrier::*;
pub use sync::*;
pub use swapchain::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
