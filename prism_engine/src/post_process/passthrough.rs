/// Passthrough topology
///
/// `Identity` plans no pass: the scene output in the frame color is
/// presented as is. `DepthView` is a single debug stage that writes the
/// linearized scene depth over the frame color.

use std::sync::Arc;
use crate::graphics_device::{Buffer, Pipeline, TextureFormat, Extent2D};
use super::blit_pass::{BlitPassDesc, PassInput, PassTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassthroughMode {
    #[default]
    Identity,
    DepthView,
}

pub fn plan(
    extent: Extent2D,
    format: TextureFormat,
    mode: PassthroughMode,
    pipeline: &Arc<dyn Pipeline>,
    params: &Arc<dyn Buffer>,
) -> Vec<BlitPassDesc> {
    match mode {
        PassthroughMode::Identity => Vec::new(),
        PassthroughMode::DepthView => vec![
            BlitPassDesc::new("depth_view", extent, format, pipeline.clone())
                .input(PassInput::Depth)
                .input(PassInput::Uniform(params.clone()))
                .target(PassTarget::Presentation),
        ],
    }
}

#[cfg(test)]
#[path = "passthrough_tests.rs"]
mod tests;
