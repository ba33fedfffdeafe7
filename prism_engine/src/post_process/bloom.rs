/// Bloom topology
///
/// ```text
/// frame color -> prefilter (1/2) -> downsample (1/4) -> ... -> downsample (1/2^N)
///                                                               |
///          upsample (additive into the next larger stage) <-----+   (optional)
///                                                               |
/// frame color += combine <--------------------------------------+
/// ```
///
/// The step count is clamped so no stage is smaller than 2x2.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::graphics_device::{Buffer, Pipeline, TextureFormat, Extent2D};
use crate::engine_debug;
use super::blit_pass::{BlitPassDesc, BlendMode, PassInput, PassTarget};

/// Upper bound of `BloomSettings::downsample_steps`
pub const MAX_BLOOM_STEPS: u32 = 8;

/// Smallest stage dimension
pub const MIN_STAGE_DIMENSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Requested downsample count, in `1..=MAX_BLOOM_STEPS`
    pub downsample_steps: u32,
    pub use_upsampling: bool,
    /// 4-tap box filter instead of the 13-tap filter
    pub box_filter: bool,
    pub intensity: f32,
    /// Luminance above which pixels bloom
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            downsample_steps: 4,
            use_upsampling: true,
            box_filter: false,
            intensity: 0.8,
            threshold: 1.0,
        }
    }
}

/// Uniform block shared by every bloom stage
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BloomParams {
    pub threshold: f32,
    pub intensity: f32,
    pub box_filter: u32,
    pub _pad: u32,
}

impl BloomParams {
    pub fn from_settings(settings: &BloomSettings) -> Self {
        Self {
            threshold: settings.threshold,
            intensity: settings.intensity,
            box_filter: settings.box_filter as u32,
            _pad: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Cached pipelines the plan draws with
#[derive(Clone)]
pub struct BloomPipelines {
    pub prefilter: Arc<dyn Pipeline>,
    pub downsample: Arc<dyn Pipeline>,
    pub upsample: Arc<dyn Pipeline>,
    pub combine: Arc<dyn Pipeline>,
}

/// Largest step count keeping every stage at least 2x2
///
/// 1 when the surface is smaller than 4 px.
pub fn max_steps(extent: Extent2D) -> u32 {
    let min = extent.min_dimension();
    if min < 2 * MIN_STAGE_DIMENSION {
        return 1;
    }
    (min / MIN_STAGE_DIMENSION).ilog2()
}

/// Requested steps clamped to `[1, max_steps(extent)]`
pub fn effective_steps(extent: Extent2D, requested: u32) -> u32 {
    requested.min(MAX_BLOOM_STEPS).clamp(1, max_steps(extent))
}

/// Extent of downsample level `level` (1 = half resolution)
pub fn stage_extent(extent: Extent2D, level: u32) -> Extent2D {
    Extent2D::new(
        (extent.width >> level).max(MIN_STAGE_DIMENSION),
        (extent.height >> level).max(MIN_STAGE_DIMENSION),
    )
}

/// Number of passes `plan` produces
pub fn pass_count(extent: Extent2D, settings: &BloomSettings) -> usize {
    if !settings.enabled {
        return 0;
    }
    let steps = effective_steps(extent, settings.downsample_steps) as usize;
    let upsamples = if settings.use_upsampling { steps - 1 } else { 0 };
    steps + upsamples + 1
}

/// Bloom passes for a frame of `extent` and `format`
///
/// Every pass binds the sampled image then `params`.
pub fn plan(
    extent: Extent2D,
    format: TextureFormat,
    settings: &BloomSettings,
    pipelines: &BloomPipelines,
    params: &Arc<dyn Buffer>,
) -> Vec<BlitPassDesc> {
    if !settings.enabled {
        return Vec::new();
    }

    let steps = effective_steps(extent, settings.downsample_steps);
    if steps != settings.downsample_steps {
        engine_debug!(
            "prism::bloom",
            "{} downsample steps requested, {} fit {}x{}",
            settings.downsample_steps, steps, extent.width, extent.height
        );
    }

    let mut passes = Vec::with_capacity(pass_count(extent, settings));

    // Downsample level L lives at stage L - 1
    for level in 1..=steps {
        let (name, pipeline, source) = if level == 1 {
            ("bloom_prefilter".to_string(), &pipelines.prefilter, PassInput::FrameColor)
        } else {
            (
                format!("bloom_downsample_{}", level),
                &pipelines.downsample,
                PassInput::Stage(level as usize - 2),
            )
        };
        passes.push(
            BlitPassDesc::new(name, stage_extent(extent, level), format, pipeline.clone())
                .input(source)
                .input(PassInput::Uniform(params.clone())),
        );
    }

    let mut last = steps as usize - 1;
    if settings.use_upsampling {
        for level in (1..steps).rev() {
            let stage = passes.len();
            passes.push(
                BlitPassDesc::new(
                    format!("bloom_upsample_{}", level),
                    stage_extent(extent, level),
                    format,
                    pipelines.upsample.clone(),
                )
                .input(PassInput::Stage(last))
                .input(PassInput::Uniform(params.clone()))
                .target(PassTarget::Stage(level as usize - 1))
                .blend(BlendMode::Additive),
            );
            last = stage;
        }
    }

    passes.push(
        BlitPassDesc::new("bloom_combine", extent, format, pipelines.combine.clone())
            .input(PassInput::Stage(last))
            .input(PassInput::Uniform(params.clone()))
            .target(PassTarget::Presentation)
            .blend(BlendMode::Additive),
    );
    passes
}

#[cfg(test)]
#[path = "bloom_tests.rs"]
mod tests;
