/// VulkanBindingGroup - descriptor set allocated from a growable pool arena
///
/// Pools are created with FREE_DESCRIPTOR_SET, so a binding group returns its
/// set when dropped. A new pool is added whenever the current ones are full.

use ash::vk;
use prism_engine::prism::{Error, Result};
use prism_engine::prism::render::{
    BindingGroup, BindingResource, Buffer, Pipeline, Texture,
};
use prism_engine::{engine_bail, engine_err, engine_info};
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::binding_type_to_vk;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_texture::VulkanTexture;

/// Descriptor pools plus the samplers their sets reference
pub(crate) struct DescriptorArena {
    ctx: Arc<GpuContext>,
    pools: Mutex<Vec<vk::DescriptorPool>>,
    samplers: SamplerCache,
}

impl DescriptorArena {
    pub(crate) fn new(ctx: Arc<GpuContext>, samplers: SamplerCache) -> Result<Self> {
        let first = Self::create_pool(&ctx.device)?;
        Ok(Self {
            ctx,
            pools: Mutex::new(vec![first]),
            samplers,
        })
    }

    fn create_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2048,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1024,
            },
        ];
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(1024);

        unsafe {
            device.create_descriptor_pool(&create_info, None)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Allocate one set, trying the newest pool first
    fn allocate(&self, layout: vk::DescriptorSetLayout) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self.pools
            .lock()
            .map_err(|_| engine_err!("prism::vulkan", "Descriptor pool lock poisoned"))?;
        let layouts = [layout];

        for &pool in pools.iter().rev() {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            match unsafe { self.ctx.device.allocate_descriptor_sets(&allocate_info) } {
                Ok(sets) => return Ok((pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => continue,
                Err(e) => engine_bail!("prism::vulkan", "Failed to allocate descriptor set: {:?}", e),
            }
        }

        let pool = Self::create_pool(&self.ctx.device)?;
        pools.push(pool);
        engine_info!("prism::vulkan", "Descriptor pools exhausted, created pool #{}", pools.len());

        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        let sets = unsafe {
            self.ctx.device.allocate_descriptor_sets(&allocate_info)
                .map_err(|e| engine_err!("prism::vulkan", "Failed to allocate descriptor set after pool growth: {:?}", e))?
        };
        Ok((pool, sets[0]))
    }

    fn free(&self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        // Hold the lock so frees never race an allocation from the same pool
        if let Ok(_pools) = self.pools.lock() {
            unsafe {
                self.ctx.device.free_descriptor_sets(pool, &[set]).ok();
            }
        }
    }
}

impl Drop for DescriptorArena {
    fn drop(&mut self) {
        if let Ok(pools) = self.pools.get_mut() {
            for pool in pools.drain(..) {
                unsafe { self.ctx.device.destroy_descriptor_pool(pool, None); }
            }
        }
    }
}

pub struct VulkanBindingGroup {
    arena: Arc<DescriptorArena>,
    pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
    set_index: u32,
    /// Keeps the descriptor set layout alive
    _pipeline: Arc<dyn Pipeline>,
}

enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

fn buffer_info(buffer: &dyn Buffer) -> DescriptorInfo {
    let buffer = unsafe { &*(buffer as *const dyn Buffer as *const VulkanBuffer) };
    DescriptorInfo::Buffer(vk::DescriptorBufferInfo::default()
        .buffer(buffer.buffer)
        .offset(0)
        .range(vk::WHOLE_SIZE))
}

impl VulkanBindingGroup {
    pub(crate) fn new(
        arena: Arc<DescriptorArena>,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Self> {
        let layout_desc = pipeline.binding_layout(set_index).ok_or_else(|| {
            Error::InvalidResource(format!(
                "set {} out of range, pipeline has {} binding group layout(s)",
                set_index, pipeline.binding_group_layout_count()
            ))
        })?;

        if layout_desc.entries.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "set {} expects {} resource(s), got {}",
                set_index, layout_desc.entries.len(), resources.len()
            )));
        }
        for (entry, resource) in layout_desc.entries.iter().zip(resources) {
            if entry.binding_type != resource.binding_type() {
                return Err(Error::InvalidResource(format!(
                    "set {} binding {} expects {:?}, got {:?}",
                    set_index, entry.binding, entry.binding_type, resource.binding_type()
                )));
            }
        }

        let infos = resources
            .iter()
            .map(|resource| match resource {
                BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                    Ok(buffer_info(*buffer))
                }
                BindingResource::SampledTexture(texture, sampler_type) => {
                    let format = texture.info().format;
                    let texture = unsafe { &*(*texture as *const dyn Texture as *const VulkanTexture) };
                    let layout = if format.is_depth() {
                        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
                    } else {
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                    };
                    Ok(DescriptorInfo::Image(vk::DescriptorImageInfo::default()
                        .image_layout(layout)
                        .image_view(texture.view)
                        .sampler(arena.samplers.get(*sampler_type)?)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let vk_pipeline = unsafe { &*(pipeline.as_ref() as *const dyn Pipeline as *const VulkanPipeline) };
        let set_layout = vk_pipeline.set_layouts[set_index as usize];
        let (pool, set) = arena.allocate(set_layout)?;

        let writes: Vec<vk::WriteDescriptorSet> = layout_desc.entries
            .iter()
            .zip(&infos)
            .map(|(entry, info)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(entry.binding)
                    .dst_array_element(0)
                    .descriptor_type(binding_type_to_vk(entry.binding_type));
                match info {
                    DescriptorInfo::Buffer(info) => write.buffer_info(std::slice::from_ref(info)),
                    DescriptorInfo::Image(info) => write.image_info(std::slice::from_ref(info)),
                }
            })
            .collect();

        unsafe {
            arena.ctx.device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Self {
            arena,
            pool,
            set,
            set_index,
            _pipeline: Arc::clone(pipeline),
        })
    }
}

impl BindingGroup for VulkanBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for VulkanBindingGroup {
    fn drop(&mut self) {
        self.arena.free(self.pool, self.set);
    }
}
