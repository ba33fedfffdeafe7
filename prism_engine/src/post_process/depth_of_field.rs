/// Depth-of-field topology
///
/// | stage | pass         | reads                          | writes            |
/// |-------|--------------|--------------------------------|-------------------|
/// | 0     | coc          | depth                          | CoC (R16, full)   |
/// | 1     | combine_coc  | frame color, CoC               | color + CoC       |
/// | 2     | bokeh        | 1                              | half resolution   |
/// | 3     | blur         | 2                              | half resolution   |
/// | 4     | combine      | frame color, 3, CoC            | full resolution   |
/// | 5     | final        | 4, CoC, 3                      | frame color       |
///
/// The final pass selects the debug view (CoC or bokeh) from the parameters.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::graphics_device::{Buffer, Pipeline, TextureFormat, Extent2D};
use super::blit_pass::{BlitPassDesc, PassInput, PassTarget};

/// Format of the circle-of-confusion stage
pub const COC_FORMAT: TextureFormat = TextureFormat::R16_SFLOAT;

/// What the final pass writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DofDebugView {
    #[default]
    Off,
    CircleOfConfusion,
    Bokeh,
}

impl DofDebugView {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Off),
            1 => Some(Self::CircleOfConfusion),
            2 => Some(Self::Bokeh),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofSettings {
    /// View-space distance in focus
    pub focus_distance: f32,
    /// Depth range around the focus distance that stays sharp
    pub focus_range: f32,
    /// Bokeh radius in half-resolution texels
    pub bokeh_radius: f32,
    pub debug_view: DofDebugView,
}

impl Default for DofSettings {
    fn default() -> Self {
        Self {
            focus_distance: 10.0,
            focus_range: 3.0,
            bokeh_radius: 4.0,
            debug_view: DofDebugView::Off,
        }
    }
}

/// Uniform block shared by every DoF stage
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DofParams {
    pub focus_distance: f32,
    pub focus_range: f32,
    pub bokeh_radius: f32,
    pub debug_view: u32,
    /// 1 / frame extent
    pub texel_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl DofParams {
    pub fn new(settings: &DofSettings, extent: Extent2D) -> Self {
        Self {
            focus_distance: settings.focus_distance,
            focus_range: settings.focus_range,
            bokeh_radius: settings.bokeh_radius,
            debug_view: settings.debug_view.index(),
            texel_size: [1.0 / extent.width.max(1) as f32, 1.0 / extent.height.max(1) as f32],
            _pad: [0.0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[derive(Clone)]
pub struct DofPipelines {
    pub coc: Arc<dyn Pipeline>,
    pub combine_coc: Arc<dyn Pipeline>,
    pub bokeh: Arc<dyn Pipeline>,
    pub blur: Arc<dyn Pipeline>,
    pub combine: Arc<dyn Pipeline>,
    pub final_select: Arc<dyn Pipeline>,
}

/// Sampled images per stage, in pipeline order (coc .. final)
pub const STAGE_SAMPLERS: [u32; 6] = [1, 2, 1, 1, 3, 3];

/// Half of `extent`, at least 1x1
pub fn half_extent(extent: Extent2D) -> Extent2D {
    Extent2D::new((extent.width / 2).max(1), (extent.height / 2).max(1))
}

/// Depth-of-field passes for a frame of `extent` and `format`
pub fn plan(
    extent: Extent2D,
    format: TextureFormat,
    pipelines: &DofPipelines,
    params: &Arc<dyn Buffer>,
) -> Vec<BlitPassDesc> {
    let half = half_extent(extent);
    let uniform = || PassInput::Uniform(params.clone());

    vec![
        BlitPassDesc::new("dof_coc", extent, COC_FORMAT, pipelines.coc.clone())
            .input(PassInput::Depth)
            .input(uniform()),
        BlitPassDesc::new("dof_combine_coc", extent, format, pipelines.combine_coc.clone())
            .input(PassInput::FrameColor)
            .input(PassInput::Stage(0))
            .input(uniform()),
        BlitPassDesc::new("dof_bokeh", half, format, pipelines.bokeh.clone())
            .input(PassInput::Stage(1))
            .input(uniform()),
        BlitPassDesc::new("dof_blur", half, format, pipelines.blur.clone())
            .input(PassInput::Stage(2))
            .input(uniform()),
        BlitPassDesc::new("dof_combine", extent, format, pipelines.combine.clone())
            .input(PassInput::FrameColor)
            .input(PassInput::Stage(3))
            .input(PassInput::Stage(0))
            .input(uniform()),
        BlitPassDesc::new("dof_final", extent, format, pipelines.final_select.clone())
            .input(PassInput::Stage(4))
            .input(PassInput::Stage(0))
            .input(PassInput::Stage(3))
            .input(uniform())
            .target(PassTarget::Presentation),
    ]
}

#[cfg(test)]
#[path = "depth_of_field_tests.rs"]
mod tests;
