/// Shader lookup and the cached handles an effect holds
///
/// Shaders are precompiled SPIR-V files named `<name>.spv` under one
/// directory. Every handle an effect acquires goes through a `HandleSet` so
/// `shutdown` can give them all back to the caches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::cache::{CacheHandle, ResourceCaches, ShaderProgram, ShaderSource};
use crate::graphics_device::{
    BindingGroupLayoutDesc, ColorBlendState, Pipeline, PipelineState, PushConstantRange, RenderPass,
    ShaderStage, Texture, TextureFormat,
};
use crate::frame::RenderContext;
use crate::io::ImageLoader;
use crate::post_process::{BlendMode, blit_layout, blit_render_pass_desc};

/// Vertex shader of every blit pass (full-screen triangle from the vertex index)
pub const FULLSCREEN_VERTEX: &str = "fullscreen.vert";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLibrary {
    root: PathBuf,
}

impl ShaderLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<name>.spv`
    pub fn source(&self, stage: ShaderStage, name: &str) -> ShaderSource {
        ShaderSource::new(stage, self.root.join(format!("{}.spv", name)))
    }

    pub fn graphics(&self, vertex: &str, fragment: &str) -> [ShaderSource; 2] {
        [
            self.source(ShaderStage::Vertex, vertex),
            self.source(ShaderStage::Fragment, fragment),
        ]
    }

    pub fn compute(&self, name: &str) -> [ShaderSource; 1] {
        [self.source(ShaderStage::Compute, name)]
    }
}

/// Cache handles owned by one effect
#[derive(Default)]
pub struct HandleSet {
    programs: Vec<CacheHandle<ShaderProgram>>,
    pipelines: Vec<CacheHandle<dyn Pipeline>>,
    textures: Vec<CacheHandle<dyn Texture>>,
    /// Blit passes by output, shared by every blit pipeline of the set
    render_passes: FxHashMap<(TextureFormat, BlendMode), Arc<dyn RenderPass>>,
}

impl HandleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&mut self, ctx: &mut RenderContext, sources: &[ShaderSource]) -> Result<Arc<ShaderProgram>> {
        let handle = ctx.caches.acquire_shader_program(ctx.device.as_ref(), sources)?;
        let program = handle.get().clone();
        self.programs.push(handle);
        Ok(program)
    }

    pub fn pipeline(
        &mut self,
        ctx: &mut RenderContext,
        program: &ShaderProgram,
        state: &PipelineState,
    ) -> Result<Arc<dyn Pipeline>> {
        let handle = ctx.caches.acquire_pipeline(ctx.device.as_ref(), program, state)?;
        let pipeline = handle.get().clone();
        self.pipelines.push(handle);
        Ok(pipeline)
    }

    pub fn compute_pipeline(
        &mut self,
        ctx: &mut RenderContext,
        program: &ShaderProgram,
        binding_layouts: &[BindingGroupLayoutDesc],
        push_constant_ranges: &[PushConstantRange],
    ) -> Result<Arc<dyn Pipeline>> {
        let handle = ctx.caches.acquire_compute_pipeline(
            ctx.device.as_ref(),
            program,
            binding_layouts,
            push_constant_ranges,
        )?;
        let pipeline = handle.get().clone();
        self.pipelines.push(handle);
        Ok(pipeline)
    }

    pub fn texture(&mut self, ctx: &mut RenderContext, loader: &dyn ImageLoader, path: &Path) -> Result<Arc<dyn Texture>> {
        let handle = ctx.caches.acquire_texture(ctx.device.as_ref(), loader, path)?;
        let texture = handle.get().clone();
        self.textures.push(handle);
        Ok(texture)
    }

    /// Full-screen pipeline for `fragment`, sampling `samplers` images plus
    /// one uniform, rendering into `format` with `blend`
    pub fn blit_pipeline(
        &mut self,
        ctx: &mut RenderContext,
        library: &ShaderLibrary,
        fragment: &str,
        format: TextureFormat,
        blend: BlendMode,
        samplers: u32,
    ) -> Result<Arc<dyn Pipeline>> {
        let program = self.program(ctx, &library.graphics(FULLSCREEN_VERTEX, fragment))?;
        let render_pass = match self.render_passes.get(&(format, blend)) {
            Some(render_pass) => render_pass.clone(),
            None => {
                let render_pass = ctx.device.create_render_pass(&blit_render_pass_desc(format, blend))?;
                self.render_passes.insert((format, blend), render_pass.clone());
                render_pass
            }
        };
        let mut state = PipelineState::fullscreen(render_pass);
        state.binding_layouts = vec![blit_layout(samplers)];
        if blend == BlendMode::Additive {
            state.color_blend = ColorBlendState::additive();
        }
        self.pipeline(ctx, &program, &state)
    }

    /// Number of handles held
    pub fn len(&self) -> usize {
        self.programs.len() + self.pipelines.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give every handle back; pipelines before the programs they use
    pub fn release(&mut self, caches: &mut ResourceCaches) {
        for handle in self.pipelines.drain(..) {
            caches.release_pipeline(handle);
        }
        for handle in self.programs.drain(..) {
            caches.release_shader_program(handle);
        }
        for handle in self.textures.drain(..) {
            caches.release_texture(handle);
        }
        self.render_passes.clear();
    }
}

#[cfg(test)]
#[path = "shader_library_tests.rs"]
mod tests;
