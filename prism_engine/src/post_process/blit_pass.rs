/// Full-screen blit passes
///
/// A pass samples its inputs and draws one full-screen triangle (3 vertices,
/// no vertex buffer) into its target.

use std::sync::Arc;
use super::GraphImageId;
use crate::graphics_device::{
    Buffer, Pipeline, BindingGroup, Framebuffer, RenderPass, RenderPassDesc, AttachmentDesc,
    LoadOp, ImageLayout, TextureFormat, Extent2D, SamplerType, BindingGroupLayoutDesc, BindingType,
    ShaderStageFlags,
};

/// What a pass samples or reads
#[derive(Clone)]
pub enum PassInput {
    /// Output of an earlier pass (by stage id)
    Stage(usize),
    /// Offscreen frame color after the scene pass
    FrameColor,
    /// Scene depth (read-only)
    Depth,
    /// Persistent parameter buffer
    Uniform(Arc<dyn Buffer>),
}

/// Where a pass writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    /// A new image owned by the graph
    Own,
    /// Accumulate into an earlier pass's image
    Stage(usize),
    /// The frame color that is finally presented
    Presentation,
}

/// Color blending of a pass into its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite
    Opaque,
    /// dst += src (upsample and combine stages)
    Additive,
}

/// One stage of a topology
#[derive(Clone)]
pub struct BlitPassDesc {
    pub name: String,
    pub extent: Extent2D,
    pub format: TextureFormat,
    /// Cached pipeline owned by the effect
    pub pipeline: Arc<dyn Pipeline>,
    pub inputs: Vec<PassInput>,
    pub target: PassTarget,
    pub blend: BlendMode,
}

impl BlitPassDesc {
    /// Opaque pass into its own image
    pub fn new(name: impl Into<String>, extent: Extent2D, format: TextureFormat, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            name: name.into(),
            extent,
            format,
            pipeline,
            inputs: Vec::new(),
            target: PassTarget::Own,
            blend: BlendMode::Opaque,
        }
    }

    pub fn input(mut self, input: PassInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn target(mut self, target: PassTarget) -> Self {
        self.target = target;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// Render pass used by blit stages of `format` with `blend`
///
/// The attachment is already in color-attachment layout when the pass
/// begins (the graph transitions it) and stays there.
pub fn blit_render_pass_desc(format: TextureFormat, blend: BlendMode) -> RenderPassDesc {
    let load_op = match blend {
        BlendMode::Additive => LoadOp::Load,
        BlendMode::Opaque => LoadOp::DontCare,
    };
    RenderPassDesc {
        color_attachments: vec![AttachmentDesc {
            load_op,
            initial_layout: ImageLayout::ColorAttachment,
            ..AttachmentDesc::color_clear(format)
        }],
        depth_attachment: None,
    }
}

/// Set 0 layout of a blit pipeline: `sampler_count` samplers then one uniform
///
/// Matches the binding order of `PassInput`s: images first, parameters last.
pub fn blit_layout(sampler_count: u32) -> BindingGroupLayoutDesc {
    BindingGroupLayoutDesc::samplers(sampler_count).with(BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT)
}

/// Image a pass reads or writes, resolved at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageRef {
    Graph(GraphImageId),
    FrameColor,
    Depth,
}

impl ImageRef {
    pub(crate) fn sampler(self) -> SamplerType {
        match self {
            ImageRef::Depth => SamplerType::NearestClamp,
            _ => SamplerType::LinearClamp,
        }
    }
}

/// Resolved pass input, in binding order
pub(crate) enum InputSource {
    Image(ImageRef),
    Uniform(Arc<dyn Buffer>),
}

/// Built pass: a stage plus its lazily created GPU bindings
pub struct BlitPass {
    desc: BlitPassDesc,
    stage_id: usize,
    pub(crate) sources: Vec<InputSource>,
    pub(crate) output: ImageRef,
    pub(crate) render_pass: Arc<dyn RenderPass>,
    pub(crate) binding_group: Option<Arc<dyn BindingGroup>>,
    pub(crate) framebuffer: Option<Arc<dyn Framebuffer>>,
}

impl BlitPass {
    pub(crate) fn new(
        desc: BlitPassDesc,
        stage_id: usize,
        sources: Vec<InputSource>,
        output: ImageRef,
        render_pass: Arc<dyn RenderPass>,
    ) -> Self {
        Self {
            desc,
            stage_id,
            sources,
            output,
            render_pass,
            binding_group: None,
            framebuffer: None,
        }
    }

    pub fn desc(&self) -> &BlitPassDesc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn stage_id(&self) -> usize {
        self.stage_id
    }

    pub fn extent(&self) -> Extent2D {
        self.desc.extent
    }

    /// True once the binding group and framebuffer exist for this build
    pub fn is_valid(&self) -> bool {
        self.binding_group.is_some() && self.framebuffer.is_some()
    }

    pub fn writes_presentation(&self) -> bool {
        self.output == ImageRef::FrameColor
    }
}
