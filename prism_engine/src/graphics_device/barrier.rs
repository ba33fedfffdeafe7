/// Pipeline barriers - memory dependencies, layout transitions and queue
/// family ownership transfers

use std::sync::Arc;
use bitflags::bitflags;
use crate::graphics_device::{Buffer, Texture, ImageLayout};

/// Queue family placeholder meaning "no ownership transfer"
pub const QUEUE_FAMILY_IGNORED: u32 = !0;

bitflags! {
    /// Memory access types
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const VERTEX_ATTRIBUTE_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const UNIFORM_READ = 1 << 2;
        const SHADER_READ = 1 << 3;
        const SHADER_WRITE = 1 << 4;
        const COLOR_ATTACHMENT_READ = 1 << 5;
        const COLOR_ATTACHMENT_WRITE = 1 << 6;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 7;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 8;
        const TRANSFER_READ = 1 << 9;
        const TRANSFER_WRITE = 1 << 10;
    }
}

bitflags! {
    /// Pipeline stages
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const FRAGMENT_SHADER = 1 << 4;
        const LATE_FRAGMENT_TESTS = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const COMPUTE_SHADER = 1 << 7;
        const TRANSFER = 1 << 8;
        const BOTTOM_OF_PIPE = 1 << 9;
    }
}

/// Buffer memory barrier
#[derive(Clone)]
pub struct BufferBarrier {
    pub buffer: Arc<dyn Buffer>,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
    /// `QUEUE_FAMILY_IGNORED` unless ownership moves between families
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
}

/// Image memory barrier with layout transition
#[derive(Clone)]
pub struct ImageBarrier {
    pub texture: Arc<dyn Texture>,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
}

/// Access and stage that produce or consume an image in `layout`
fn layout_usage(layout: ImageLayout) -> (AccessFlags, PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined => (AccessFlags::empty(), PipelineStageFlags::TOP_OF_PIPE),
        ImageLayout::General => (
            AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
            PipelineStageFlags::COMPUTE_SHADER,
        ),
        ImageLayout::ColorAttachment => (
            AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        ImageLayout::DepthStencilAttachment => (
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStageFlags::EARLY_FRAGMENT_TESTS | PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        ImageLayout::DepthStencilReadOnly => (
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::SHADER_READ,
            PipelineStageFlags::EARLY_FRAGMENT_TESTS | PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ImageLayout::ShaderReadOnly => (AccessFlags::SHADER_READ, PipelineStageFlags::FRAGMENT_SHADER),
        ImageLayout::TransferSrc => (AccessFlags::TRANSFER_READ, PipelineStageFlags::TRANSFER),
        ImageLayout::TransferDst => (AccessFlags::TRANSFER_WRITE, PipelineStageFlags::TRANSFER),
        ImageLayout::PresentSrc => (AccessFlags::empty(), PipelineStageFlags::BOTTOM_OF_PIPE),
    }
}

impl ImageBarrier {
    /// Layout transition with access masks and stages derived from both layouts
    pub fn transition(texture: Arc<dyn Texture>, old_layout: ImageLayout, new_layout: ImageLayout) -> Self {
        let (src_access, src_stage) = layout_usage(old_layout);
        let (dst_access, dst_stage) = layout_usage(new_layout);
        Self {
            texture,
            old_layout,
            new_layout,
            src_access,
            dst_access,
            src_stage,
            dst_stage,
        }
    }

    /// Depth written by the scene pass -> sampled by a fragment shader
    ///
    /// The layout stays read-only; this is a memory dependency only.
    pub fn depth_write_to_sampled(texture: Arc<dyn Texture>) -> Self {
        Self {
            texture,
            old_layout: ImageLayout::DepthStencilReadOnly,
            new_layout: ImageLayout::DepthStencilReadOnly,
            src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            src_stage: PipelineStageFlags::LATE_FRAGMENT_TESTS,
            dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
        }
    }

    /// Render-target write -> fragment shader read
    pub fn attachment_to_sampled(texture: Arc<dyn Texture>) -> Self {
        Self {
            texture,
            old_layout: ImageLayout::ColorAttachment,
            new_layout: ImageLayout::ShaderReadOnly,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::SHADER_READ,
            src_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: PipelineStageFlags::FRAGMENT_SHADER,
        }
    }

    /// Fragment shader read -> render-target write
    pub fn sampled_to_attachment(texture: Arc<dyn Texture>) -> Self {
        Self {
            texture,
            old_layout: ImageLayout::ShaderReadOnly,
            new_layout: ImageLayout::ColorAttachment,
            src_access: AccessFlags::SHADER_READ,
            dst_access: AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            src_stage: PipelineStageFlags::FRAGMENT_SHADER,
            dst_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        }
    }
}
