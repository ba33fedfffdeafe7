//! Mock-device fixture shared by the post-process tests

use std::sync::Arc;
use crate::error::Result;
use crate::frame::{FrameConfig, FrameTargets, RenderContext};
use crate::graphics_device::{
    BindingGroupLayoutDesc, Buffer, BufferDesc, BufferUsage, Extent2D, GraphicsDevice, MemoryLocation,
    Pipeline, PipelineDesc, PipelineState, QueueType, ShaderDesc, ShaderStage, TextureFormat,
    mock_graphics_device::MockGraphicsDevice,
};
use super::{BlitPassDesc, BlendMode, PassInput, PassTarget, PostProcessGraph, blit_layout, blit_render_pass_desc};

pub const COLOR: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

pub struct Fixture {
    pub device: Arc<MockGraphicsDevice>,
    pub ctx: RenderContext,
    pub targets: FrameTargets,
    pub sampled: Arc<dyn Pipeline>,
    pub depth_sampled: Arc<dyn Pipeline>,
}

impl Fixture {
    pub fn new(width: u32, height: u32) -> Self {
        let device = Arc::new(MockGraphicsDevice::new());
        let mut ctx = RenderContext::new(device.clone());
        let targets = FrameTargets::create(
            device.as_ref(),
            &mut ctx.pool,
            Extent2D::new(width, height),
            &FrameConfig::default(),
        )
        .unwrap();
        let sampled = blit_pipeline(&device, BindingGroupLayoutDesc::samplers(1));
        let depth_sampled = blit_pipeline(&device, blit_layout(1));
        Self { device, ctx, targets, sampled, depth_sampled }
    }

    pub fn extent(&self) -> Extent2D {
        self.targets.extent()
    }

    /// Graphics pipeline binding `samplers` images and one uniform
    pub fn pipeline(&self, samplers: u32) -> Arc<dyn Pipeline> {
        blit_pipeline(&self.device, blit_layout(samplers))
    }

    pub fn uniform(&self, size: u64) -> Arc<dyn Buffer> {
        self.device
            .create_buffer(BufferDesc { size, usage: BufferUsage::UNIFORM, location: MemoryLocation::CpuToGpu })
            .unwrap()
    }

    pub fn build(&mut self, graph: &mut PostProcessGraph, topology: Vec<BlitPassDesc>) -> Result<()> {
        graph.build(&mut self.ctx, topology, &self.targets)
    }

    pub fn reconfigure(&mut self, graph: &mut PostProcessGraph, topology: Vec<BlitPassDesc>) -> Result<()> {
        graph.reconfigure(&mut self.ctx, topology, &self.targets)
    }

    pub fn execute(&self, graph: &mut PostProcessGraph) -> u32 {
        let mut cmd = self.device.create_command_list(QueueType::Graphics).unwrap();
        cmd.begin().unwrap();
        let draws = graph.execute(self.device.as_ref(), cmd.as_mut(), &self.targets).unwrap();
        cmd.end().unwrap();
        draws
    }

    /// Copy the frame color into a half-size stage, then add it back
    pub fn copy_and_add(&self) -> Vec<BlitPassDesc> {
        let full = self.extent();
        let half = Extent2D::new(full.width / 2, full.height / 2);
        vec![
            BlitPassDesc::new("copy", half, COLOR, self.sampled.clone()).input(PassInput::FrameColor),
            BlitPassDesc::new("add", full, COLOR, self.sampled.clone())
                .input(PassInput::Stage(0))
                .target(PassTarget::Presentation)
                .blend(BlendMode::Additive),
        ]
    }
}

pub fn blit_pipeline(device: &MockGraphicsDevice, layout: BindingGroupLayoutDesc) -> Arc<dyn Pipeline> {
    let shader = device
        .create_shader(ShaderDesc { code: &[], stage: ShaderStage::Fragment, entry_point: "main".to_string() })
        .unwrap();
    let render_pass = device.create_render_pass(&blit_render_pass_desc(COLOR, BlendMode::Opaque)).unwrap();
    let mut state = PipelineState::fullscreen(render_pass);
    state.binding_layouts = vec![layout];
    device
        .create_pipeline(PipelineDesc { vertex_shader: shader.clone(), fragment_shader: shader, state })
        .unwrap()
}
