/// RenderPass trait - describes how attachments are loaded, stored and transitioned

use crate::graphics_device::TextureFormat;

/// Render pass trait
///
/// Keeps the description it was created from, so pipelines can be keyed by
/// render pass content.
pub trait RenderPass: Send + Sync {
    fn desc(&self) -> &RenderPassDesc;
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_attachment: Option<AttachmentDesc>,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Color attachment that is overwritten (initial layout undefined)
    pub fn color_clear(format: TextureFormat) -> Self {
        Self {
            format,
            samples: 1,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ColorAttachment,
        }
    }

    /// Color attachment whose previous contents are kept
    pub fn color_load(format: TextureFormat) -> Self {
        Self {
            load_op: LoadOp::Load,
            initial_layout: ImageLayout::ColorAttachment,
            ..Self::color_clear(format)
        }
    }

    /// Color attachment fully covered by a full-screen draw
    pub fn color_dont_care(format: TextureFormat) -> Self {
        Self {
            load_op: LoadOp::DontCare,
            ..Self::color_clear(format)
        }
    }
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    /// Depth attachment that is also sampled
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}
