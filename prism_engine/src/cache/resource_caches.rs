/// The three GPU caches owned by a `RenderContext`
///
/// - shader programs, keyed by their ordered (stage, file path) list
/// - pipelines, keyed by pipeline state content plus the program key
/// - textures, keyed by file path

use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::cache::{ResourceCache, CacheHandle, CacheStats, ResourceKey};
use crate::graphics_device::{
    GraphicsDevice, Shader, ShaderDesc, ShaderStage, Pipeline, PipelineDesc, PipelineState,
    ComputePipelineDesc, BindingGroupLayoutDesc, PushConstantRange,
    Texture, TextureDesc, TextureFormat, TextureUsage,
};
use crate::io::ImageLoader;
use crate::engine_error;

/// SPIR-V magic number (first word of every module)
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// One stage of a shader program on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    /// Path to a compiled SPIR-V file
    pub path: PathBuf,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, path: impl Into<PathBuf>) -> Self {
        Self { stage, path: path.into() }
    }
}

/// Set of shader modules loaded together
pub struct ShaderProgram {
    key: ResourceKey,
    shaders: Vec<(ShaderStage, Arc<dyn Shader>)>,
}

impl ShaderProgram {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Module for `stage`, if the program has one
    pub fn shader(&self, stage: ShaderStage) -> Option<&Arc<dyn Shader>> {
        self.shaders.iter().find(|(s, _)| *s == stage).map(|(_, shader)| shader)
    }

    fn require(&self, stage: ShaderStage) -> Result<Arc<dyn Shader>> {
        self.shader(stage).cloned().ok_or_else(|| {
            Error::InvalidResource(format!("shader program {} has no {:?} stage", self.key, stage))
        })
    }
}

/// Key of a shader program
pub fn shader_program_key(sources: &[ShaderSource]) -> ResourceKey {
    ResourceKey::build(|hasher| {
        "program".hash(hasher);
        sources.hash(hasher);
    })
}

/// Key of a graphics pipeline
pub fn pipeline_key(program: ResourceKey, state: &PipelineState) -> ResourceKey {
    ResourceKey::build(|hasher| {
        "graphics".hash(hasher);
        program.hash(hasher);
        state.hash_content(hasher);
    })
}

/// Key of a compute pipeline
pub fn compute_pipeline_key(
    program: ResourceKey,
    binding_layouts: &[BindingGroupLayoutDesc],
    push_constant_ranges: &[PushConstantRange],
) -> ResourceKey {
    ResourceKey::build(|hasher| {
        "compute".hash(hasher);
        program.hash(hasher);
        binding_layouts.hash(hasher);
        push_constant_ranges.hash(hasher);
    })
}

/// Key of a file texture
pub fn texture_key(path: &Path) -> ResourceKey {
    ResourceKey::build(|hasher| {
        "texture".hash(hasher);
        path.to_string_lossy().hash(hasher);
    })
}

/// Read a SPIR-V file, rejecting anything that is not a SPIR-V module
fn read_spirv(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|e| {
        engine_error!("prism::ResourceCache", "Cannot read shader '{}': {}", path.display(), e);
        Error::InvalidResource(format!("shader file '{}': {}", path.display(), e))
    })?;
    let magic = bytes.get(0..4).map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
    if bytes.len() % 4 != 0 || magic != Some(SPIRV_MAGIC) {
        engine_error!("prism::ResourceCache", "'{}' is not a SPIR-V module", path.display());
        return Err(Error::InvalidResource(format!("'{}' is not a SPIR-V module", path.display())));
    }
    Ok(bytes)
}

/// Shader program, pipeline and texture caches
pub struct ResourceCaches {
    programs: ResourceCache<ShaderProgram>,
    pipelines: ResourceCache<dyn Pipeline>,
    textures: ResourceCache<dyn Texture>,
}

impl Default for ResourceCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCaches {
    pub fn new() -> Self {
        Self {
            programs: ResourceCache::new("programs"),
            pipelines: ResourceCache::new("pipelines"),
            textures: ResourceCache::new("textures"),
        }
    }

    // ===== SHADER PROGRAMS =====

    /// Load (or share) the program made of `sources`
    pub fn acquire_shader_program(
        &mut self,
        device: &dyn GraphicsDevice,
        sources: &[ShaderSource],
    ) -> Result<CacheHandle<ShaderProgram>> {
        let key = shader_program_key(sources);
        self.programs.acquire_with(key, || {
            let mut shaders = Vec::with_capacity(sources.len());
            for source in sources {
                let code = read_spirv(&source.path)?;
                let shader = device.create_shader(ShaderDesc {
                    code: &code,
                    stage: source.stage,
                    entry_point: "main".to_string(),
                })?;
                shaders.push((source.stage, shader));
            }
            Ok(Arc::new(ShaderProgram { key, shaders }))
        })
    }

    pub fn release_shader_program(&mut self, handle: CacheHandle<ShaderProgram>) -> bool {
        self.programs.release(handle)
    }

    // ===== PIPELINES =====

    /// Graphics pipeline for `program` with `state`
    pub fn acquire_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        program: &ShaderProgram,
        state: &PipelineState,
    ) -> Result<CacheHandle<dyn Pipeline>> {
        let key = pipeline_key(program.key(), state);
        self.pipelines.acquire_with(key, || {
            device.create_pipeline(PipelineDesc {
                vertex_shader: program.require(ShaderStage::Vertex)?,
                fragment_shader: program.require(ShaderStage::Fragment)?,
                state: state.clone(),
            })
        })
    }

    /// Compute pipeline for the compute stage of `program`
    pub fn acquire_compute_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        program: &ShaderProgram,
        binding_layouts: &[BindingGroupLayoutDesc],
        push_constant_ranges: &[PushConstantRange],
    ) -> Result<CacheHandle<dyn Pipeline>> {
        let key = compute_pipeline_key(program.key(), binding_layouts, push_constant_ranges);
        self.pipelines.acquire_with(key, || {
            device.create_compute_pipeline(ComputePipelineDesc {
                shader: program.require(ShaderStage::Compute)?,
                binding_layouts: binding_layouts.to_vec(),
                push_constant_ranges: push_constant_ranges.to_vec(),
            })
        })
    }

    pub fn release_pipeline(&mut self, handle: CacheHandle<dyn Pipeline>) -> bool {
        self.pipelines.release(handle)
    }

    // ===== TEXTURES =====

    /// Decode `path` with `loader` and upload it as an sRGB texture
    pub fn acquire_texture(
        &mut self,
        device: &dyn GraphicsDevice,
        loader: &dyn ImageLoader,
        path: &Path,
    ) -> Result<CacheHandle<dyn Texture>> {
        self.textures.acquire_with(texture_key(path), || {
            let image = loader.load_rgba8(path)?;
            let expected = image.width as usize * image.height as usize * 4;
            if image.pixels.len() != expected {
                return Err(Error::InvalidResource(format!(
                    "'{}' decoded to {} bytes, expected {}",
                    path.display(), image.pixels.len(), expected
                )));
            }
            device.create_texture(TextureDesc {
                width: image.width,
                height: image.height,
                format: TextureFormat::R8G8B8A8_SRGB,
                usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
                data: Some(image.pixels),
            })
        })
    }

    pub fn release_texture(&mut self, handle: CacheHandle<dyn Texture>) -> bool {
        self.textures.release(handle)
    }

    // ===== INSPECTION =====

    pub fn programs(&self) -> &ResourceCache<ShaderProgram> {
        &self.programs
    }

    pub fn pipelines(&self) -> &ResourceCache<dyn Pipeline> {
        &self.pipelines
    }

    pub fn textures(&self) -> &ResourceCache<dyn Texture> {
        &self.textures
    }

    /// (programs, pipelines, textures)
    pub fn stats(&self) -> (CacheStats, CacheStats, CacheStats) {
        (self.programs.stats(), self.pipelines.stats(), self.textures.stats())
    }

    /// Drop everything (teardown). Pipelines go before the programs they use.
    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.programs.clear();
        self.textures.clear();
    }
}

#[cfg(test)]
#[path = "resource_caches_tests.rs"]
mod tests;
