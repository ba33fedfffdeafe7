/// SamplerCache - VkSampler per SamplerType preset, created on first use

use ash::vk;
use prism_engine::prism::Result;
use prism_engine::prism::render::SamplerType;
use prism_engine::engine_err;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

use crate::vulkan_context::GpuContext;

pub(crate) struct SamplerCache {
    ctx: Arc<GpuContext>,
    samplers: Mutex<FxHashMap<SamplerType, vk::Sampler>>,
    /// 0 when the device lacks samplerAnisotropy
    max_anisotropy: f32,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>, max_anisotropy: f32) -> Self {
        Self {
            ctx,
            samplers: Mutex::new(FxHashMap::default()),
            max_anisotropy,
        }
    }

    pub(crate) fn get(&self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let mut samplers = self.samplers
            .lock()
            .map_err(|_| engine_err!("prism::vulkan", "Sampler cache lock poisoned"))?;

        if let Some(&sampler) = samplers.get(&sampler_type) {
            return Ok(sampler);
        }

        let sampler = self.create(sampler_type)?;
        samplers.insert(sampler_type, sampler);
        Ok(sampler)
    }

    fn create(&self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let (filter, mipmap, address, anisotropic) = match sampler_type {
            SamplerType::LinearClamp => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                false,
            ),
            SamplerType::NearestClamp => (
                vk::Filter::NEAREST,
                vk::SamplerMipmapMode::NEAREST,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                false,
            ),
            SamplerType::LinearRepeat => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::REPEAT,
                true,
            ),
        };
        let anisotropy = anisotropic && self.max_anisotropy >= 1.0;

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .anisotropy_enable(anisotropy)
            .max_anisotropy(if anisotropy { self.max_anisotropy.min(16.0) } else { 1.0 })
            .unnormalized_coordinates(false);

        unsafe {
            self.ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create {:?} sampler: {:?}", sampler_type, e))
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        if let Ok(samplers) = self.samplers.get_mut() {
            for (_, sampler) in samplers.drain() {
                unsafe { self.ctx.device.destroy_sampler(sampler, None); }
            }
        }
    }
}
