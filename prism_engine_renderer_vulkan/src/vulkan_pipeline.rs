/// VulkanPipeline - graphics and compute pipelines with their layouts
///
/// When a descriptor carries no binding layouts they are rebuilt from the
/// shaders' SPIR-V reflection. The same goes for push constant ranges.

use ash::vk;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    Pipeline, PipelineBindPoint, PipelineDesc, ComputePipelineDesc, PipelineState,
    BindingGroupLayoutDesc, PushConstantRange, RenderPass, Shader, ShaderStage,
};
use prism_engine::{engine_debug, engine_err};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    binding_type_to_vk, blend_factor_to_vk, blend_op_to_vk, buffer_format_to_vk, compare_op_to_vk,
    cull_mode_to_vk, front_face_to_vk, input_rate_to_vk, polygon_mode_to_vk, sample_count_to_vk,
    shader_stage_to_vk, stage_flags_to_vk, topology_to_vk,
};
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_shader::{merge_binding_layouts, VulkanShader};

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    binding_layouts: Vec<BindingGroupLayoutDesc>,
    bind_point: PipelineBindPoint,
}

fn vulkan_shader(shader: &Arc<dyn Shader>) -> &VulkanShader {
    unsafe { &*(shader.as_ref() as *const dyn Shader as *const VulkanShader) }
}

fn expect_stage(shader: &VulkanShader, stage: ShaderStage) -> Result<()> {
    if shader.stage != stage {
        return Err(Error::InvalidResource(format!(
            "expected a {:?} shader, got {:?}", stage, shader.stage
        )));
    }
    Ok(())
}

/// Push constant ranges as given, or one range covering every stage that
/// declares a push constant block
fn resolve_push_constants(given: &[PushConstantRange], shaders: &[&VulkanShader]) -> Vec<vk::PushConstantRange> {
    if !given.is_empty() {
        return given
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: range.stages.iter().fold(vk::ShaderStageFlags::empty(), |flags, stage| {
                    flags | shader_stage_to_vk(*stage)
                }),
                offset: range.offset,
                size: range.size,
            })
            .collect();
    }

    let declared: Vec<(ShaderStage, u32)> = shaders
        .iter()
        .filter_map(|shader| shader.push_constant_size.map(|size| (shader.stage, size)))
        .collect();
    match declared.iter().map(|(_, size)| *size).max() {
        Some(size) if size > 0 => vec![vk::PushConstantRange {
            stage_flags: declared.iter().fold(vk::ShaderStageFlags::empty(), |flags, (stage, _)| {
                flags | shader_stage_to_vk(*stage)
            }),
            offset: 0,
            size,
        }],
        _ => Vec::new(),
    }
}

impl VulkanPipeline {
    /// Pipeline shell with its descriptor set layouts and pipeline layout
    ///
    /// The pipeline handle is filled in by the caller; Drop cleans up
    /// whatever was created.
    fn with_layout(
        ctx: Arc<GpuContext>,
        binding_layouts: Vec<BindingGroupLayoutDesc>,
        push_constant_ranges: &[vk::PushConstantRange],
        bind_point: PipelineBindPoint,
    ) -> Result<Self> {
        let mut pipeline = Self {
            ctx,
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            set_layouts: Vec::with_capacity(binding_layouts.len()),
            binding_layouts,
            bind_point,
        };

        for layout_desc in &pipeline.binding_layouts {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = layout_desc.entries
                .iter()
                .map(|entry| vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(binding_type_to_vk(entry.binding_type))
                    .descriptor_count(entry.count)
                    .stage_flags(stage_flags_to_vk(entry.stage_flags)))
                .collect();

            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let set_layout = unsafe {
                pipeline.ctx.device.create_descriptor_set_layout(&create_info, None)
                    .map_err(|e| engine_err!("prism::vulkan", "Failed to create descriptor set layout: {:?}", e))?
            };
            pipeline.set_layouts.push(set_layout);
        }

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&pipeline.set_layouts)
            .push_constant_ranges(push_constant_ranges);
        pipeline.layout = unsafe {
            pipeline.ctx.device.create_pipeline_layout(&layout_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create pipeline layout: {:?}", e))?
        };

        Ok(pipeline)
    }

    pub(crate) fn new_graphics(ctx: Arc<GpuContext>, desc: PipelineDesc) -> Result<Self> {
        let vertex = vulkan_shader(&desc.vertex_shader);
        let fragment = vulkan_shader(&desc.fragment_shader);
        expect_stage(vertex, ShaderStage::Vertex)?;
        expect_stage(fragment, ShaderStage::Fragment)?;

        let state = &desc.state;
        let binding_layouts = if state.binding_layouts.is_empty() {
            merge_binding_layouts(&[vertex.reflection(), fragment.reflection()])?
        } else {
            state.binding_layouts.clone()
        };
        let push_constants = resolve_push_constants(&state.push_constant_ranges, &[vertex, fragment]);

        let mut pipeline = Self::with_layout(ctx, binding_layouts, &push_constants, PipelineBindPoint::Graphics)?;
        pipeline.pipeline = pipeline.create_graphics(vertex, fragment, state)?;

        engine_debug!("prism::vulkan", "Graphics pipeline created ({} set layout(s), {} push constant range(s))",
            pipeline.set_layouts.len(), push_constants.len());
        Ok(pipeline)
    }

    fn create_graphics(&self, vertex: &VulkanShader, fragment: &VulkanShader, state: &PipelineState) -> Result<vk::Pipeline> {
        let render_pass = unsafe {
            &*(state.render_pass.as_ref() as *const dyn RenderPass as *const VulkanRenderPass)
        };
        let color_attachment_count = state.render_pass.desc().color_attachments.len();

        let stages = [vertex.stage_create_info(), fragment.stage_create_info()];

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = state.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: input_rate_to_vk(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = state.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: buffer_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(state.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic
        let viewport = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(state.rasterization.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(state.rasterization.cull_mode))
            .front_face(front_face_to_vk(state.rasterization.front_face))
            .depth_bias_enable(state.rasterization.depth_bias.is_some());
        if let Some(bias) = state.rasterization.depth_bias {
            rasterization = rasterization
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_slope_factor(bias.slope_factor)
                .depth_bias_clamp(bias.clamp);
        }

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(state.multisample.sample_count))
            .alpha_to_coverage_enable(state.multisample.alpha_to_coverage);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(state.depth_stencil.depth_test_enable)
            .depth_write_enable(state.depth_stencil.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(state.depth_stencil.depth_compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let blend = &state.color_blend;
        let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(blend.blend_enable)
            .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
            .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
            .color_blend_op(blend_op_to_vk(blend.color_blend_op))
            .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
            .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
            .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op));
        let blend_attachments = vec![blend_attachment; color_attachment_count];

        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(self.layout)
            .render_pass(render_pass.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            self.ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| engine_err!("prism::vulkan", "Failed to create graphics pipeline: {:?}", e))?
        };
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| engine_err!("prism::vulkan", "Driver returned no graphics pipeline"))
    }

    pub(crate) fn new_compute(ctx: Arc<GpuContext>, desc: ComputePipelineDesc) -> Result<Self> {
        let shader = vulkan_shader(&desc.shader);
        expect_stage(shader, ShaderStage::Compute)?;

        let binding_layouts = if desc.binding_layouts.is_empty() {
            merge_binding_layouts(&[shader.reflection()])?
        } else {
            desc.binding_layouts.clone()
        };
        let push_constants = resolve_push_constants(&desc.push_constant_ranges, &[shader]);

        let mut pipeline = Self::with_layout(ctx, binding_layouts, &push_constants, PipelineBindPoint::Compute)?;

        let create_info = vk::ComputePipelineCreateInfo::default()
            .stage(shader.stage_create_info())
            .layout(pipeline.layout);

        let pipelines = unsafe {
            pipeline.ctx.device
                .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| engine_err!("prism::vulkan", "Failed to create compute pipeline: {:?}", e))?
        };
        pipeline.pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| engine_err!("prism::vulkan", "Driver returned no compute pipeline"))?;

        engine_debug!("prism::vulkan", "Compute pipeline created ({} set layout(s))", pipeline.set_layouts.len());
        Ok(pipeline)
    }

    pub(crate) fn vk_bind_point(&self) -> vk::PipelineBindPoint {
        match self.bind_point {
            PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }
}

impl Pipeline for VulkanPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn binding_layout(&self, set: u32) -> Option<&BindingGroupLayoutDesc> {
        self.binding_layouts.get(set as usize)
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.binding_layouts.len() as u32
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            for set_layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}
