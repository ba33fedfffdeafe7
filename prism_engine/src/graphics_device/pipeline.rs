/// Pipeline trait and pipeline descriptors
///
/// Every state struct here implements `Hash` so the pipeline cache can key
/// pipelines by content. Floats are hashed by their bit pattern.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::graphics_device::{
    Shader, BufferFormat, ShaderStage, RenderPass, BindingGroupLayoutDesc,
};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    /// Format of the attribute (data type and component count)
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout
///
/// An empty layout means the vertex shader generates its own positions
/// (full-screen triangle).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// Push constant range descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: Vec<ShaderStage>,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

// ===== RASTERIZATION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Depth bias parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant_factor: f32,
    pub slope_factor: f32,
    pub clamp: f32,
}

impl Hash for DepthBias {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.constant_factor.to_bits().hash(state);
        self.slope_factor.to_bits().hash(state);
        self.clamp.to_bits().hash(state);
    }
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    /// None = disabled
    pub depth_bias: Option<DepthBias>,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            depth_bias: None,
        }
    }
}

// ===== DEPTH =====

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: CompareOp,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Less,
        }
    }
}

impl DepthStencilState {
    /// Depth test and write off (post-process passes)
    pub fn disabled() -> Self {
        Self {
            depth_test_enable: false,
            depth_write_enable: false,
            depth_compare_op: CompareOp::Always,
        }
    }
}

// ===== COLOR BLEND =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Color blending state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
        }
    }
}

impl ColorBlendState {
    /// dst = src + dst (bloom upsample and combine)
    pub fn additive() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::One,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::Zero,
            dst_alpha_factor: BlendFactor::One,
            alpha_blend_op: BlendOp::Add,
        }
    }
}

// ===== MULTISAMPLE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleState {
    pub sample_count: SampleCount,
    pub alpha_to_coverage: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            sample_count: SampleCount::S1,
            alpha_to_coverage: false,
        }
    }
}

// ===== PIPELINE STATE =====

/// Everything a graphics pipeline needs besides its shader modules
///
/// The cache hashes this together with the shader program key.
#[derive(Clone)]
pub struct PipelineState {
    /// Render pass the pipeline must be compatible with
    pub render_pass: Arc<dyn RenderPass>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    /// Binding group layouts, one per set. Empty = reflect from the shaders.
    pub binding_layouts: Vec<BindingGroupLayoutDesc>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    pub color_blend: ColorBlendState,
    pub multisample: MultisampleState,
}

impl PipelineState {
    /// Default opaque triangle-list state for `render_pass`
    pub fn new(render_pass: Arc<dyn RenderPass>) -> Self {
        Self {
            render_pass,
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            binding_layouts: Vec::new(),
            push_constant_ranges: Vec::new(),
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::default(),
            color_blend: ColorBlendState::default(),
            multisample: MultisampleState::default(),
        }
    }

    /// Full-screen triangle state: no vertex input, no culling, no depth
    pub fn fullscreen(render_pass: Arc<dyn RenderPass>) -> Self {
        Self {
            rasterization: RasterizationState {
                cull_mode: CullMode::None,
                ..RasterizationState::default()
            },
            depth_stencil: DepthStencilState::disabled(),
            ..Self::new(render_pass)
        }
    }

    /// Hash every field that affects the created pipeline
    ///
    /// The render pass contributes its description, not its identity, so a
    /// render pass recreated after a resize maps to the same pipeline.
    pub fn hash_content<H: Hasher>(&self, state: &mut H) {
        self.render_pass.desc().hash(state);
        self.vertex_layout.hash(state);
        self.topology.hash(state);
        self.binding_layouts.hash(state);
        self.push_constant_ranges.hash(state);
        self.rasterization.hash(state);
        self.depth_stencil.hash(state);
        self.color_blend.hash(state);
        self.multisample.hash(state);
    }
}

/// Descriptor for creating a graphics pipeline
#[derive(Clone)]
pub struct PipelineDesc {
    pub vertex_shader: Arc<dyn Shader>,
    pub fragment_shader: Arc<dyn Shader>,
    pub state: PipelineState,
}

/// Descriptor for creating a compute pipeline
#[derive(Clone)]
pub struct ComputePipelineDesc {
    pub shader: Arc<dyn Shader>,
    /// Empty = reflect from the shader
    pub binding_layouts: Vec<BindingGroupLayoutDesc>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

/// Pipeline bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Pipeline resource trait
///
/// Implemented by backend-specific pipeline types (e.g., VulkanPipeline).
/// The pipeline is automatically destroyed when dropped.
pub trait Pipeline: Send + Sync {
    fn bind_point(&self) -> PipelineBindPoint;

    /// Layout of binding group `set`, if the pipeline has one
    fn binding_layout(&self, set: u32) -> Option<&BindingGroupLayoutDesc>;

    /// Number of binding group layouts
    fn binding_group_layout_count(&self) -> u32;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
