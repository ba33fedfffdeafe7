/// VulkanCommandList - primary command buffer with its own command pool
///
/// The pool belongs to the family of the queue the list was created for, so
/// compute lists can be submitted to a dedicated compute family.

use ash::vk;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    CommandList, QueueType, RenderPass, Framebuffer, Pipeline, Buffer, BindingGroup, Texture,
    IndexType, ShaderStageFlags, BufferBarrier, ImageBarrier, Viewport, Rect2D, ClearValue,
};
use prism_engine::engine_err;
use std::sync::Arc;

use crate::vulkan_binding_group::VulkanBindingGroup;
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    access_to_vk, aspect_for, image_layout_to_vk, index_type_to_vk, queue_family_to_vk,
    stage_flags_to_vk, stages_to_vk,
};
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_texture::VulkanTexture;

pub struct VulkanCommandList {
    ctx: Arc<GpuContext>,
    queue: QueueType,
    command_pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
    /// Layout of the last bound pipeline (for push constants)
    bound_layout: Option<vk::PipelineLayout>,
}

fn vk_pipeline(pipeline: &Arc<dyn Pipeline>) -> &VulkanPipeline {
    unsafe { &*(pipeline.as_ref() as *const dyn Pipeline as *const VulkanPipeline) }
}

fn vk_buffer(buffer: &Arc<dyn Buffer>) -> vk::Buffer {
    unsafe { (*(buffer.as_ref() as *const dyn Buffer as *const VulkanBuffer)).buffer }
}

fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue { float32: *color },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
        },
    }
}

impl VulkanCommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>, queue: QueueType) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.queue(queue).family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("prism::vulkan", "Failed to allocate command buffer: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                queue,
                command_pool,
                command_buffer,
                is_recording: false,
                in_render_pass: false,
                bound_layout: None,
            })
        }
    }

    fn require_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn require_render_pass(&self) -> Result<()> {
        self.require_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }

    /// Recording and outside any render pass (transfers, barriers, dispatch)
    pub(crate) fn require_outside_render_pass(&self) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Command not allowed inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl CommandList for VulkanCommandList {
    fn queue(&self) -> QueueType {
        self.queue
    }

    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        self.bound_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_outside_render_pass()?;

        let vk_render_pass = unsafe { &*(render_pass.as_ref() as *const dyn RenderPass as *const VulkanRenderPass) };
        let vk_framebuffer = unsafe { &*(framebuffer.as_ref() as *const dyn Framebuffer as *const VulkanFramebuffer) };

        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass()?;
        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.require_recording()?;
        let pipeline = vk_pipeline(pipeline);

        unsafe {
            self.ctx.device.cmd_bind_pipeline(self.command_buffer, pipeline.vk_bind_point(), pipeline.pipeline);
        }
        self.bound_layout = Some(pipeline.layout);
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.require_recording()?;

        if binding_group.set_index() != set_index {
            return Err(Error::InvalidResource(format!(
                "binding group was created for set {}, bound at set {}",
                binding_group.set_index(), set_index
            )));
        }

        let pipeline = vk_pipeline(pipeline);
        let group = unsafe { &*(binding_group.as_ref() as *const dyn BindingGroup as *const VulkanBindingGroup) };

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                pipeline.vk_bind_point(),
                pipeline.layout,
                set_index,
                &[group.set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.require_recording()?;

        let layout = self.bound_layout.ok_or_else(|| {
            Error::BackendError("No pipeline bound for push constants".to_string())
        })?;

        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                layout,
                stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, binding: u32, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.require_recording()?;
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, binding, &[vk_buffer(buffer)], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_recording()?;
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer(buffer),
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_render_pass()?;
        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.require_render_pass()?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.require_outside_render_pass()?;
        unsafe {
            self.ctx.device.cmd_dispatch(self.command_buffer, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn pipeline_barrier(&mut self, buffers: &[BufferBarrier], images: &[ImageBarrier]) -> Result<()> {
        self.require_outside_render_pass()?;
        if buffers.is_empty() && images.is_empty() {
            return Ok(());
        }

        let mut src_stage = vk::PipelineStageFlags::empty();
        let mut dst_stage = vk::PipelineStageFlags::empty();

        let buffer_barriers: Vec<vk::BufferMemoryBarrier> = buffers
            .iter()
            .map(|barrier| {
                src_stage |= stages_to_vk(barrier.src_stage);
                dst_stage |= stages_to_vk(barrier.dst_stage);
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(access_to_vk(barrier.src_access))
                    .dst_access_mask(access_to_vk(barrier.dst_access))
                    .src_queue_family_index(queue_family_to_vk(barrier.src_queue_family))
                    .dst_queue_family_index(queue_family_to_vk(barrier.dst_queue_family))
                    .buffer(vk_buffer(&barrier.buffer))
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
            })
            .collect();

        let image_barriers: Vec<vk::ImageMemoryBarrier> = images
            .iter()
            .map(|barrier| {
                src_stage |= stages_to_vk(barrier.src_stage);
                dst_stage |= stages_to_vk(barrier.dst_stage);
                let texture = unsafe {
                    &*(barrier.texture.as_ref() as *const dyn Texture as *const VulkanTexture)
                };
                vk::ImageMemoryBarrier::default()
                    .old_layout(image_layout_to_vk(barrier.old_layout))
                    .new_layout(image_layout_to_vk(barrier.new_layout))
                    .src_access_mask(access_to_vk(barrier.src_access))
                    .dst_access_mask(access_to_vk(barrier.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(texture.image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: aspect_for(barrier.texture.info().format),
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
            })
            .collect();

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
        Ok(())
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with it
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
