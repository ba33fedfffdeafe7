/// BindingGroup trait and binding group descriptors
///
/// A BindingGroup is an immutable set of GPU resource bindings (textures,
/// buffers, samplers), the abstraction over descriptor sets.
///
/// - Immutable after creation
/// - Layout comes from the pipeline
/// - Pool managed internally by the backend

use bitflags::bitflags;
use crate::graphics_device::{Texture, Buffer, ShaderStage};

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    /// Texture and sampler in one binding
    CombinedImageSampler,
    StorageBuffer,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl ShaderStageFlags {
    /// Create from a slice of ShaderStage
    pub fn from_stages(stages: &[ShaderStage]) -> Self {
        stages.iter().fold(Self::empty(), |flags, stage| {
            flags | match stage {
                ShaderStage::Vertex => Self::VERTEX,
                ShaderStage::Fragment => Self::FRAGMENT,
                ShaderStage::Compute => Self::COMPUTE,
            }
        })
    }
}

/// Description of a single binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlotDesc {
    /// `layout(binding = N)` in GLSL
    pub binding: u32,
    pub binding_type: BindingType,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

/// Layout of one binding group (one descriptor set)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingGroupLayoutDesc {
    pub entries: Vec<BindingSlotDesc>,
}

impl BindingGroupLayoutDesc {
    /// `count` combined image samplers at bindings 0..count, fragment stage
    pub fn samplers(count: u32) -> Self {
        Self {
            entries: (0..count)
                .map(|binding| BindingSlotDesc {
                    binding,
                    binding_type: BindingType::CombinedImageSampler,
                    count: 1,
                    stage_flags: ShaderStageFlags::FRAGMENT,
                })
                .collect(),
        }
    }

    /// Append one slot at the next binding index
    pub fn with(mut self, binding_type: BindingType, stage_flags: ShaderStageFlags) -> Self {
        self.entries.push(BindingSlotDesc {
            binding: self.entries.len() as u32,
            binding_type,
            count: 1,
            stage_flags,
        });
        self
    }
}

// ============================================================================
// Binding resources
// ============================================================================

/// Sampler preset, resolved by the backend sampler cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Bilinear, clamp to edge (post-process inputs)
    LinearClamp,
    /// Point, clamp to edge (depth, CoC)
    NearestClamp,
    /// Bilinear with mipmaps, repeat (material textures)
    LinearRepeat,
}

/// A concrete resource to bind into a BindingGroup
pub enum BindingResource<'a> {
    UniformBuffer(&'a dyn Buffer),
    SampledTexture(&'a dyn Texture, SamplerType),
    StorageBuffer(&'a dyn Buffer),
}

impl BindingResource<'_> {
    pub fn binding_type(&self) -> BindingType {
        match self {
            BindingResource::UniformBuffer(_) => BindingType::UniformBuffer,
            BindingResource::SampledTexture(..) => BindingType::CombinedImageSampler,
            BindingResource::StorageBuffer(_) => BindingType::StorageBuffer,
        }
    }
}

// ============================================================================
// BindingGroup trait
// ============================================================================

/// An immutable set of GPU resource bindings
pub trait BindingGroup: Send + Sync {
    /// Set index this group was created for
    fn set_index(&self) -> u32;
}
