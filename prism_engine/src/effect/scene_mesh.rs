/// Mesh drawn inside the scene pass
///
/// Set 0: camera uniforms (binding 0, one per ring slot), material uniforms
/// (binding 1) and the diffuse texture (binding 2). Without a diffuse
/// texture a 1x1 white texture is bound.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::graphics_device::{
    BindingGroupLayoutDesc, BindingResource, BindingType, Buffer, BufferDesc, BufferUsage, CommandList,
    IndexType, MemoryLocation, Pipeline, PipelineState, SamplerType, ShaderStageFlags, Texture, TextureDesc,
    TextureFormat, TextureUsage,
};
use crate::frame::{FrameTargets, RenderContext};
use crate::io::{BoundingBox, CameraUniforms, DecodedImage, ImageLoader, Material, MeshDescription};
use crate::{engine_debug, engine_warn};
use super::{FrameUpdate, HandleSet, ShaderLibrary, UniformRing, uniform_buffer};

pub const SCENE_VERTEX: &str = "mesh.vert";
pub const SCENE_FRAGMENT: &str = "mesh.frag";

/// std140 material block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub emission: [f32; 4],
}

impl MaterialUniforms {
    pub fn from_material(material: &Material) -> Self {
        Self {
            ambient: material.ambient.extend(1.0).to_array(),
            diffuse: material.diffuse.extend(1.0).to_array(),
            emission: material.emission.extend(1.0).to_array(),
        }
    }
}

pub struct SceneMesh {
    pipeline: Arc<dyn Pipeline>,
    vertex_buffer: Arc<dyn Buffer>,
    binding_offsets: Vec<u64>,
    index_buffer: Option<Arc<dyn Buffer>>,
    draw_count: u32,
    material: Arc<dyn Buffer>,
    texture: Arc<dyn Texture>,
    camera: UniformRing,
    bounds: BoundingBox,
}

impl SceneMesh {
    /// Set 0 layout of the scene pipeline
    pub fn layout() -> BindingGroupLayoutDesc {
        BindingGroupLayoutDesc::default()
            .with(BindingType::UniformBuffer, ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT)
            .with(BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT)
            .with(BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT)
    }

    /// Upload `mesh` and acquire its pipeline and diffuse texture
    ///
    /// The diffuse texture of the first material is loaded through `loader`
    /// and the texture cache.
    pub fn create(
        ctx: &mut RenderContext,
        handles: &mut HandleSet,
        library: &ShaderLibrary,
        mesh: &MeshDescription,
        loader: Option<&dyn ImageLoader>,
        targets: &FrameTargets,
    ) -> Result<Self> {
        let program = handles.program(ctx, &library.graphics(SCENE_VERTEX, SCENE_FRAGMENT))?;
        let mut state = PipelineState::new(targets.scene_pass().clone());
        state.vertex_layout = mesh.vertex_layout();
        state.binding_layouts = vec![Self::layout()];
        let pipeline = handles.pipeline(ctx, &program, &state)?;

        let device = ctx.device.clone();
        let upload = mesh.vertex_bytes();
        let vertex_buffer = device.create_buffer(BufferDesc {
            size: upload.bytes.len() as u64,
            usage: BufferUsage::VERTEX,
            location: MemoryLocation::CpuToGpu,
        })?;
        vertex_buffer.update(0, &upload.bytes)?;

        let (index_buffer, draw_count) = if mesh.indices().is_empty() {
            (None, mesh.vertex_count())
        } else {
            let bytes = mesh.index_bytes();
            let buffer = device.create_buffer(BufferDesc {
                size: bytes.len() as u64,
                usage: BufferUsage::INDEX,
                location: MemoryLocation::CpuToGpu,
            })?;
            buffer.update(0, bytes)?;
            (Some(buffer), mesh.indices().len() as u32)
        };

        let default_material = Material::default();
        let first = mesh.materials().first().unwrap_or(&default_material);
        let material = uniform_buffer(device.as_ref(), bytemuck::bytes_of(&MaterialUniforms::from_material(first)))?;

        let texture = match (&first.diffuse_texture, loader) {
            (Some(path), Some(loader)) => handles.texture(ctx, loader, path)?,
            (Some(path), None) => {
                engine_warn!("prism::SceneMesh", "no image loader for '{}', using white", path.display());
                white_texture(ctx)?
            }
            (None, _) => white_texture(ctx)?,
        };

        engine_debug!(
            "prism::SceneMesh",
            "{} vertices, {} indices, {} vertex bindings",
            mesh.vertex_count(), mesh.indices().len(), upload.binding_offsets.len()
        );

        Ok(Self {
            pipeline,
            vertex_buffer,
            binding_offsets: upload.binding_offsets,
            index_buffer,
            draw_count,
            material,
            texture,
            camera: UniformRing::new(),
            bounds: *mesh.bounds(),
        })
    }

    /// Write the camera block of `frame.slot`
    pub fn update(&mut self, ctx: &RenderContext, frame: &FrameUpdate) -> Result<()> {
        let uniforms = CameraUniforms::from_input(frame.input);
        let Self { camera, pipeline, material, texture, .. } = self;
        camera.write(ctx.device(), frame.slot, uniforms.as_bytes(), |buffer| {
            ctx.device.create_binding_group(pipeline, 0, &[
                BindingResource::UniformBuffer(buffer.as_ref()),
                BindingResource::UniformBuffer(material.as_ref()),
                BindingResource::SampledTexture(texture.as_ref(), SamplerType::LinearRepeat),
            ])
        })
    }

    /// Bind and draw; returns the number of draw calls
    pub fn record(&self, cmd: &mut dyn CommandList) -> Result<u32> {
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_binding_group(&self.pipeline, 0, self.camera.group()?)?;
        for (binding, offset) in self.binding_offsets.iter().enumerate() {
            cmd.bind_vertex_buffer(binding as u32, &self.vertex_buffer, *offset)?;
        }
        match &self.index_buffer {
            Some(index_buffer) => {
                cmd.bind_index_buffer(index_buffer, 0, IndexType::U32)?;
                cmd.draw_indexed(self.draw_count, 0, 0)?;
            }
            None => cmd.draw(self.draw_count, 0)?,
        }
        Ok(1)
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }
}

fn white_texture(ctx: &RenderContext) -> Result<Arc<dyn Texture>> {
    let image = DecodedImage::solid(1, 1, [255; 4]);
    ctx.device.create_texture(TextureDesc {
        width: image.width,
        height: image.height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
        data: Some(image.pixels),
    })
}

#[cfg(test)]
#[path = "scene_mesh_tests.rs"]
mod tests;
