/// VulkanShader - shader module plus its SPIR-V reflection
///
/// Descriptor bindings and push constant blocks are read with spirq when the
/// module is created. Pipelines created without explicit binding layouts
/// build them from this reflection.

use ash::vk;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    Shader, ShaderDesc, ShaderStage, ShaderStageFlags, BindingType, BindingSlotDesc,
    BindingGroupLayoutDesc,
};
use prism_engine::{engine_bail, engine_err, engine_trace};
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::shader_stage_to_vk;

/// One descriptor binding found in a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReflectedBinding {
    pub set: u32,
    pub binding: u32,
    pub binding_type: BindingType,
    pub count: u32,
}

pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStage,
    pub(crate) entry_point: CString,
    pub(crate) bindings: Vec<ReflectedBinding>,
    /// Size of the push constant block, if the module declares one
    pub(crate) push_constant_size: Option<u32>,
}

impl VulkanShader {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: ShaderDesc) -> Result<Self> {
        if desc.code.is_empty() || desc.code.len() % 4 != 0 {
            return Err(Error::InvalidResource(format!(
                "SPIR-V size {} is not a non-zero multiple of 4", desc.code.len()
            )));
        }

        let words = ash::util::read_spv(&mut std::io::Cursor::new(desc.code))
            .map_err(|e| Error::InvalidResource(format!("unreadable SPIR-V: {}", e)))?;

        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|_| Error::InvalidResource(format!("bad entry point name {:?}", desc.entry_point)))?;

        let (bindings, push_constant_size) = reflect(&words)?;
        engine_trace!("prism::vulkan", "{:?} shader: {} binding(s), push constants {:?}",
            desc.stage, bindings.len(), push_constant_size);

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            ctx.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create shader module: {:?}", e))?
        };

        Ok(Self {
            ctx,
            module,
            stage: desc.stage,
            entry_point,
            bindings,
            push_constant_size,
        })
    }

    pub(crate) fn reflection(&self) -> (ShaderStage, &[ReflectedBinding]) {
        (self.stage, &self.bindings)
    }

    pub(crate) fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(shader_stage_to_vk(self.stage))
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Shader for VulkanShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

fn reflect(words: &[u32]) -> Result<(Vec<ReflectedBinding>, Option<u32>)> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(words)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| Error::InvalidResource(format!("SPIR-V reflection failed: {:?}", e)))?;

    let mut bindings: Vec<ReflectedBinding> = Vec::new();
    let mut push_constant_size = None;

    for entry_point in &entry_points {
        for var in &entry_point.vars {
            match var {
                spirq::var::Variable::Descriptor { desc_bind, desc_ty, nbind, .. } => {
                    let binding = ReflectedBinding {
                        set: desc_bind.set(),
                        binding: desc_bind.bind(),
                        binding_type: binding_type(desc_ty)?,
                        count: (*nbind).max(1),
                    };
                    if !bindings.contains(&binding) {
                        bindings.push(binding);
                    }
                }
                spirq::var::Variable::PushConstant { ty, .. } => {
                    let size = ty.nbyte().map(|n| n as u32);
                    push_constant_size = push_constant_size.max(size);
                }
                _ => {}
            }
        }
    }

    Ok((bindings, push_constant_size))
}

fn binding_type(desc_ty: &spirq::ty::DescriptorType) -> Result<BindingType> {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => Ok(BindingType::UniformBuffer),
        DescriptorType::StorageBuffer(..) => Ok(BindingType::StorageBuffer),
        DescriptorType::CombinedImageSampler() => Ok(BindingType::CombinedImageSampler),
        other => Err(Error::UnsupportedFormat(format!("descriptor type {:?}", other))),
    }
}

/// Merge the bindings of several stages into one layout per set
///
/// Sets without bindings get an empty layout so set indices stay dense.
pub(crate) fn merge_binding_layouts(
    stages: &[(ShaderStage, &[ReflectedBinding])],
) -> Result<Vec<BindingGroupLayoutDesc>> {
    let mut layouts: Vec<BindingGroupLayoutDesc> = Vec::new();

    for (shader_stage, bindings) in stages {
        let stage = ShaderStageFlags::from_stages(&[*shader_stage]);
        for reflected in bindings.iter() {
            let set = reflected.set as usize;
            if layouts.len() <= set {
                layouts.resize_with(set + 1, BindingGroupLayoutDesc::default);
            }
            let entries = &mut layouts[set].entries;
            match entries.iter_mut().find(|e| e.binding == reflected.binding) {
                Some(existing) if existing.binding_type != reflected.binding_type => {
                    engine_bail!("prism::vulkan",
                        "set {} binding {} is {:?} in one stage and {:?} in another",
                        reflected.set, reflected.binding, existing.binding_type, reflected.binding_type);
                }
                Some(existing) => existing.stage_flags |= stage,
                None => entries.push(BindingSlotDesc {
                    binding: reflected.binding,
                    binding_type: reflected.binding_type,
                    count: reflected.count,
                    stage_flags: stage,
                }),
            }
        }
    }

    for layout in &mut layouts {
        layout.entries.sort_by_key(|e| e.binding);
    }
    Ok(layouts)
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
