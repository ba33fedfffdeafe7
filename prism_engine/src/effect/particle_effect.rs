/// GPU particle system
///
/// A compute shader advances every particle in a storage buffer that the
/// scene pass then reads as a point-list vertex buffer. The buffer changes
/// queue ownership twice per frame:
///
/// ```text
/// compute:  acquire (graphics -> compute), dispatch, release (compute -> graphics)
/// graphics: acquire before the scene pass, draw points, release after it
/// ```
///
/// Both sides record their barriers every frame, so the pairs always match.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::graphics_device::{
    BindingGroupLayoutDesc, BindingResource, BindingType, Buffer, BufferDesc, BufferFormat, BufferUsage,
    ColorBlendState, CommandList, CompareOp, DepthStencilState, MemoryLocation, Pipeline, PipelineState,
    PrimitiveTopology, ShaderStageFlags, VertexAttribute, VertexBinding, VertexInputRate, VertexLayout,
};
use crate::compute::{
    QueueOwnershipTransfer, record_compute_dispatch, record_graphics_acquire, record_graphics_release,
};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::CameraUniforms;
use crate::{engine_bail, engine_info};
use super::{
    Effect, FrameUpdate, HandleSet, ParameterChange, RebuildKind, ShaderLibrary, UniformRing, unknown_parameter,
};

/// Local size of the simulation shader
pub const PARTICLE_WORKGROUP_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSettings {
    pub particle_count: u32,
    /// Particles spawned per second
    pub emission_rate: f32,
    /// Seconds a particle lives
    pub lifetime: f32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            particle_count: 16384,
            emission_rate: 4096.0,
            lifetime: 4.0,
        }
    }
}

/// One particle as stored in the shared buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// xyz = position, w = age in seconds (negative = not emitted yet)
    pub position: [f32; 4],
    /// xyz = velocity, w = random seed in [0, 1)
    pub velocity: [f32; 4],
}

impl Particle {
    /// Particle `index` waiting at the origin for its emission time
    pub fn initial(index: u32, emission_rate: f32) -> Self {
        let seed = (index.wrapping_mul(2_654_435_761) >> 8) as f32 / (1u32 << 24) as f32;
        Self {
            position: [0.0, 0.0, 0.0, -(index as f32) / emission_rate],
            velocity: [0.0, 0.0, 0.0, seed],
        }
    }
}

/// std140 simulation block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SimulationParams {
    pub time: f32,
    pub delta_time: f32,
    pub emission_rate: f32,
    pub lifetime: f32,
    pub particle_count: u32,
    pub _pad: [u32; 3],
}

/// Vertex layout of the particle buffer read as points
pub fn particle_vertex_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding {
            binding: 0,
            stride: std::mem::size_of::<Particle>() as u32,
            input_rate: VertexInputRate::Vertex,
        }],
        attributes: vec![
            VertexAttribute { location: 0, binding: 0, format: BufferFormat::R32G32B32A32_SFLOAT, offset: 0 },
            VertexAttribute { location: 1, binding: 0, format: BufferFormat::R32G32B32A32_SFLOAT, offset: 16 },
        ],
    }
}

/// Pipelines and buffers created by `setup`
struct ParticleResources {
    particles: Arc<dyn Buffer>,
    transfer: QueueOwnershipTransfer,
    simulate: Arc<dyn Pipeline>,
    render: Arc<dyn Pipeline>,
}

pub struct ParticleEffect {
    library: ShaderLibrary,
    settings: ParticleSettings,
    handles: HandleSet,
    resources: Option<ParticleResources>,
    simulation: UniformRing,
    camera: UniformRing,
}

impl ParticleEffect {
    pub fn new(library: ShaderLibrary, settings: ParticleSettings) -> Self {
        Self {
            library,
            settings,
            handles: HandleSet::new(),
            resources: None,
            simulation: UniformRing::new(),
            camera: UniformRing::new(),
        }
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    fn resources(&self) -> Result<&ParticleResources> {
        match &self.resources {
            Some(resources) => Ok(resources),
            None => engine_bail!("prism::ParticleEffect", "used before setup"),
        }
    }
}

impl Effect for ParticleEffect {
    fn name(&self) -> &str {
        "particles"
    }

    fn setup(&mut self, ctx: &mut RenderContext, targets: &FrameTargets) -> Result<()> {
        let count = self.settings.particle_count.max(1);
        self.settings.particle_count = count;

        let initial: Vec<Particle> = (0..count)
            .map(|index| Particle::initial(index, self.settings.emission_rate))
            .collect();
        let particles = ctx.device.create_buffer(BufferDesc {
            size: (initial.len() * std::mem::size_of::<Particle>()) as u64,
            usage: BufferUsage::STORAGE | BufferUsage::VERTEX,
            location: MemoryLocation::CpuToGpu,
        })?;
        particles.update(0, bytemuck::cast_slice(&initial))?;

        let simulate_program = self.handles.program(ctx, &self.library.compute("particles_simulate.comp"))?;
        let simulate_layout = BindingGroupLayoutDesc::default()
            .with(BindingType::StorageBuffer, ShaderStageFlags::COMPUTE)
            .with(BindingType::UniformBuffer, ShaderStageFlags::COMPUTE);
        let simulate = self.handles.compute_pipeline(ctx, &simulate_program, &[simulate_layout], &[])?;

        let render_program = self.handles.program(ctx, &self.library.graphics("particles.vert", "particles.frag"))?;
        let mut state = PipelineState::new(targets.scene_pass().clone());
        state.vertex_layout = particle_vertex_layout();
        state.topology = PrimitiveTopology::PointList;
        state.binding_layouts = vec![
            BindingGroupLayoutDesc::default().with(BindingType::UniformBuffer, ShaderStageFlags::VERTEX),
        ];
        state.depth_stencil = DepthStencilState {
            depth_test_enable: true,
            depth_write_enable: false,
            depth_compare_op: CompareOp::Less,
        };
        state.color_blend = ColorBlendState::additive();
        let render = self.handles.pipeline(ctx, &render_program, &state)?;

        let transfer = QueueOwnershipTransfer::for_device(ctx.device(), particles.clone());
        engine_info!(
            "prism::ParticleEffect",
            "{} particles, {} queue families",
            count, if transfer.is_cross_family() { "separate" } else { "shared" }
        );
        self.resources = Some(ParticleResources { particles, transfer, simulate, render });
        Ok(())
    }

    fn resize(&mut self, _ctx: &mut RenderContext, _targets: &FrameTargets) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, ctx: &RenderContext, frame: &FrameUpdate) -> Result<()> {
        let Some(resources) = &self.resources else {
            engine_bail!("prism::ParticleEffect", "update before setup");
        };

        let params = SimulationParams {
            time: frame.input.time,
            delta_time: frame.input.delta_time,
            emission_rate: self.settings.emission_rate,
            lifetime: self.settings.lifetime,
            particle_count: self.settings.particle_count,
            _pad: [0; 3],
        };
        self.simulation.write(ctx.device(), frame.slot, bytemuck::bytes_of(&params), |buffer| {
            ctx.device.create_binding_group(&resources.simulate, 0, &[
                BindingResource::StorageBuffer(resources.particles.as_ref()),
                BindingResource::UniformBuffer(buffer.as_ref()),
            ])
        })?;

        let camera = CameraUniforms::from_input(frame.input);
        self.camera.write(ctx.device(), frame.slot, camera.as_bytes(), |buffer| {
            ctx.device.create_binding_group(&resources.render, 0, &[BindingResource::UniformBuffer(buffer.as_ref())])
        })
    }

    fn record_compute(&mut self, _ctx: &RenderContext, cmd: &mut dyn CommandList) -> Result<bool> {
        let resources = self.resources()?;
        record_compute_dispatch(
            cmd,
            &resources.transfer,
            &resources.simulate,
            self.simulation.group()?,
            self.settings.particle_count,
            PARTICLE_WORKGROUP_SIZE,
        )?;
        Ok(true)
    }

    fn record_pre_scene(&mut self, _ctx: &RenderContext, cmd: &mut dyn CommandList) -> Result<()> {
        record_graphics_acquire(cmd, &self.resources()?.transfer)
    }

    fn record_scene(&mut self, _ctx: &RenderContext, cmd: &mut dyn CommandList, _targets: &FrameTargets) -> Result<u32> {
        let resources = self.resources()?;
        cmd.bind_pipeline(&resources.render)?;
        cmd.bind_binding_group(&resources.render, 0, self.camera.group()?)?;
        cmd.bind_vertex_buffer(0, &resources.particles, 0)?;
        cmd.draw(self.settings.particle_count, 0)?;
        Ok(1)
    }

    fn record_post(&mut self, _ctx: &RenderContext, cmd: &mut dyn CommandList, _targets: &FrameTargets) -> Result<u32> {
        record_graphics_release(cmd, &self.resources()?.transfer)?;
        Ok(0)
    }

    fn apply_parameter(&mut self, _ctx: &mut RenderContext, change: &ParameterChange) -> Result<RebuildKind> {
        // picked up by the next update
        match change.name.as_str() {
            "emission_rate" => self.settings.emission_rate = change.as_positive_f32()?,
            "lifetime" => self.settings.lifetime = change.as_positive_f32()?,
            _ => return Err(unknown_parameter(self.name(), change)),
        }
        Ok(RebuildKind::Parameters)
    }

    fn shutdown(&mut self, ctx: &mut RenderContext) {
        self.simulation.clear();
        self.camera.clear();
        self.resources = None;
        self.handles.release(&mut ctx.caches);
    }
}

#[cfg(test)]
#[path = "particle_effect_tests.rs"]
mod tests;
