//! Mock-device harness shared by the effect tests

use std::path::{Path, PathBuf};
use std::sync::Arc;
use glam::{Vec2, Vec3, Vec4};
use crate::error::{Error, Result};
use crate::frame::{FrameConfig, FrameTargets, RenderContext};
use crate::graphics_device::{CommandList, Extent2D, GraphicsDevice, QueueType, mock_graphics_device::MockGraphicsDevice};
use crate::io::{DecodedImage, FrameInput, ImageLoader, Material, MeshDescription};
use super::{Effect, FrameUpdate, ShaderLibrary};

/// Every shader file an effect may ask for
pub const SHADER_FILES: [&str; 16] = [
    "fullscreen.vert",
    "mesh.vert",
    "mesh.frag",
    "bloom_prefilter.frag",
    "bloom_downsample.frag",
    "bloom_upsample.frag",
    "bloom_combine.frag",
    "dof_coc.frag",
    "dof_combine_coc.frag",
    "dof_bokeh.frag",
    "dof_blur.frag",
    "dof_combine.frag",
    "dof_final.frag",
    "particles_simulate.comp",
    "particles.vert",
    "particles.frag",
];

/// Scratch directory of header-only SPIR-V files, removed on drop
pub struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("prism_effect_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let words: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        for name in SHADER_FILES.iter().chain(["depth_view.frag"].iter()) {
            std::fs::write(root.join(format!("{}.spv", name)), &bytes).unwrap();
        }
        Self { root }
    }

    pub fn library(&self) -> ShaderLibrary {
        ShaderLibrary::new(&self.root)
    }

    pub fn remove(&self, name: &str) {
        std::fs::remove_file(self.root.join(format!("{}.spv", name))).unwrap();
    }
}

impl Drop for ShaderDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Indexed quad with every attribute, one textured material
pub fn quad(texture: Option<&str>) -> MeshDescription {
    let positions = vec![
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ];
    let material = Material {
        name: "quad".to_string(),
        diffuse_texture: texture.map(PathBuf::from),
        ..Material::default()
    };
    MeshDescription::from_streams(
        positions,
        vec![Vec3::Z; 4],
        vec![Vec4::ONE; 4],
        vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
        vec![0, 1, 2, 2, 3, 0],
        vec![material],
    )
    .unwrap()
}

/// Non-indexed triangle with positions only
pub fn triangle() -> MeshDescription {
    MeshDescription::from_streams(
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
    )
    .unwrap()
}

/// Loader returning a 2x2 image, failing on paths containing "missing"
pub struct SolidLoader;

impl ImageLoader for SolidLoader {
    fn load_rgba8(&self, path: &Path) -> Result<DecodedImage> {
        if path.to_string_lossy().contains("missing") {
            return Err(Error::InvalidResource(format!("{}", path.display())));
        }
        Ok(DecodedImage::solid(2, 2, [200, 100, 50, 255]))
    }
}

/// Device, context and frame targets at a fixed extent
pub struct Harness {
    pub device: Arc<MockGraphicsDevice>,
    pub ctx: RenderContext,
    pub targets: FrameTargets,
}

impl Harness {
    pub fn new(width: u32, height: u32) -> Self {
        Self::on(Arc::new(MockGraphicsDevice::new()), width, height)
    }

    pub fn on(device: Arc<MockGraphicsDevice>, width: u32, height: u32) -> Self {
        let mut ctx = RenderContext::new(device.clone());
        let targets = FrameTargets::create(
            device.as_ref(),
            &mut ctx.pool,
            Extent2D::new(width, height),
            &FrameConfig::default(),
        )
        .unwrap();
        Self { device, ctx, targets }
    }

    pub fn setup(&mut self, effect: &mut dyn Effect) -> Result<()> {
        effect.setup(&mut self.ctx, &self.targets)
    }

    /// Swap the frame targets for ones at `width` x `height` and resize
    pub fn resize(&mut self, effect: &mut dyn Effect, width: u32, height: u32) -> Result<()> {
        let targets = FrameTargets::create(
            self.device.as_ref(),
            &mut self.ctx.pool,
            Extent2D::new(width, height),
            &FrameConfig::default(),
        )?;
        let old = std::mem::replace(&mut self.targets, targets);
        old.release(&mut self.ctx.pool);
        effect.resize(&mut self.ctx, &self.targets)
    }

    /// Update, then record the graphics work of one frame
    ///
    /// Returns (draw calls, post-process passes).
    pub fn frame(&self, effect: &mut dyn Effect, slot: usize) -> (u32, u32) {
        let input = FrameInput::default();
        effect.update(&self.ctx, &FrameUpdate { input: &input, slot }).unwrap();
        let mut cmd = self.device.create_command_list(QueueType::Graphics).unwrap();
        cmd.begin().unwrap();
        effect.record_pre_scene(&self.ctx, cmd.as_mut()).unwrap();
        let draws = effect.record_scene(&self.ctx, cmd.as_mut(), &self.targets).unwrap();
        let passes = effect.record_post(&self.ctx, cmd.as_mut(), &self.targets).unwrap();
        cmd.end().unwrap();
        (draws, passes)
    }

    /// Record the compute work of one frame; false when there was none
    pub fn compute(&self, effect: &mut dyn Effect) -> bool {
        let mut cmd: Box<dyn CommandList> = self.device.create_command_list(QueueType::Compute).unwrap();
        cmd.begin().unwrap();
        let recorded = effect.record_compute(&self.ctx, cmd.as_mut()).unwrap();
        cmd.end().unwrap();
        recorded
    }

    /// Shut `effect` down and report the cache entries still alive
    pub fn shutdown(&mut self, effect: &mut dyn Effect) -> usize {
        effect.shutdown(&mut self.ctx);
        let (programs, pipelines, textures) = self.ctx.caches.stats();
        programs.entries + pipelines.entries + textures.entries
    }
}
