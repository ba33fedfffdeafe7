/// GraphicsDevice trait - factory for GPU resources and queue submission

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Texture, TextureDesc, Shader, ShaderDesc,
    Pipeline, PipelineDesc, ComputePipelineDesc,
    RenderPass, RenderPassDesc, RenderTarget, Framebuffer, FramebufferDesc,
    BindingGroup, BindingResource, CommandList, Fence, Semaphore,
    PipelineStageFlags,
};

/// Queue a command list is recorded for and submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    Graphics,
    /// Async compute queue (falls back to the graphics family when the
    /// device has no dedicated compute family)
    Compute,
}

/// One queue submission
pub struct SubmitInfo<'a> {
    pub queue: QueueType,
    pub command_lists: &'a [&'a dyn CommandList],
    /// Semaphores to wait on, each at the given stage
    pub wait: &'a [(&'a dyn Semaphore, PipelineStageFlags)],
    pub signal: &'a [&'a dyn Semaphore],
    /// Signaled when every command list has completed
    pub fence: Option<&'a dyn Fence>,
}

/// Device statistics (totals since creation)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers: u32,
    pub textures: u32,
    pub pipelines: u32,
    pub submits: u32,
}

/// Main graphics device trait
///
/// All methods take `&self`; backends use interior locking.
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
pub trait GraphicsDevice: Send + Sync {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture, uploading `desc.data` through a staging buffer
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_compute_pipeline(&self, desc: ComputePipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create an attachment view over `texture`
    fn create_render_target(&self, texture: &dyn Texture) -> Result<Arc<dyn RenderTarget>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a binding group for set `set_index` of `pipeline`
    ///
    /// `resources` must match the layout slot for slot.
    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    fn create_command_list(&self, queue: QueueType) -> Result<Box<dyn CommandList>>;

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    fn submit(&self, info: &SubmitInfo) -> Result<()>;

    /// Submit and block until the queue is done (setup transfers)
    fn submit_and_wait(&self, queue: QueueType, command_lists: &[&dyn CommandList]) -> Result<()>;

    /// Queue family index backing `queue`
    fn queue_family_index(&self, queue: QueueType) -> u32;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    fn stats(&self) -> DeviceStats;
}
