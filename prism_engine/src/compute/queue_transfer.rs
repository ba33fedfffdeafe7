/// Cross-queue ownership transfer for buffers shared by the graphics and
/// compute queues
///
/// A buffer read as vertex input on the graphics queue and written by a
/// compute shader changes hands twice per frame. When both queues share a
/// family the barriers still order the accesses but carry no transfer.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, QueueType, Buffer, BufferBarrier, CommandList, Pipeline, BindingGroup,
    AccessFlags, PipelineStageFlags, QUEUE_FAMILY_IGNORED,
};
use crate::engine_trace;

/// Number of work groups covering `element_count` items
pub fn dispatch_group_count(element_count: u32, workgroup_size: u32) -> u32 {
    debug_assert!(workgroup_size > 0, "workgroup size must be non-zero");
    if workgroup_size == 0 {
        return 0;
    }
    element_count.div_ceil(workgroup_size)
}

/// Shared buffer and the two queue families it moves between
#[derive(Clone)]
pub struct QueueOwnershipTransfer {
    buffer: Arc<dyn Buffer>,
    graphics_family: u32,
    compute_family: u32,
}

impl QueueOwnershipTransfer {
    pub fn new(buffer: Arc<dyn Buffer>, graphics_family: u32, compute_family: u32) -> Self {
        Self { buffer, graphics_family, compute_family }
    }

    /// Families taken from `device`
    pub fn for_device(device: &dyn GraphicsDevice, buffer: Arc<dyn Buffer>) -> Self {
        Self::new(
            buffer,
            device.queue_family_index(QueueType::Graphics),
            device.queue_family_index(QueueType::Compute),
        )
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    /// True when the families differ and ownership actually moves
    pub fn is_cross_family(&self) -> bool {
        self.graphics_family != self.compute_family
    }

    fn families(&self, from: u32, to: u32) -> (u32, u32) {
        if self.is_cross_family() {
            (from, to)
        } else {
            (QUEUE_FAMILY_IGNORED, QUEUE_FAMILY_IGNORED)
        }
    }

    /// Vertex-input read on graphics -> shader write on compute
    pub fn graphics_to_compute(&self) -> BufferBarrier {
        let (src_queue_family, dst_queue_family) = self.families(self.graphics_family, self.compute_family);
        BufferBarrier {
            buffer: self.buffer.clone(),
            src_access: AccessFlags::VERTEX_ATTRIBUTE_READ,
            dst_access: AccessFlags::SHADER_WRITE,
            src_stage: PipelineStageFlags::VERTEX_INPUT,
            dst_stage: PipelineStageFlags::COMPUTE_SHADER,
            src_queue_family,
            dst_queue_family,
        }
    }

    /// Shader write on compute -> vertex-input read on graphics
    pub fn compute_to_graphics(&self) -> BufferBarrier {
        let (src_queue_family, dst_queue_family) = self.families(self.compute_family, self.graphics_family);
        BufferBarrier {
            buffer: self.buffer.clone(),
            src_access: AccessFlags::SHADER_WRITE,
            dst_access: AccessFlags::VERTEX_ATTRIBUTE_READ,
            src_stage: PipelineStageFlags::COMPUTE_SHADER,
            dst_stage: PipelineStageFlags::VERTEX_INPUT,
            src_queue_family,
            dst_queue_family,
        }
    }

    /// `graphics_to_compute` as recorded on the compute queue
    ///
    /// Across families the source half belongs to the graphics release, so
    /// it becomes TOP_OF_PIPE with no access: a compute-only queue does not
    /// support the vertex-input stage.
    pub fn compute_acquire(&self) -> BufferBarrier {
        let mut barrier = self.graphics_to_compute();
        if self.is_cross_family() {
            barrier.src_access = AccessFlags::empty();
            barrier.src_stage = PipelineStageFlags::TOP_OF_PIPE;
        }
        barrier
    }

    /// `compute_to_graphics` as recorded on the compute queue
    ///
    /// Across families the destination half belongs to the graphics acquire
    /// and becomes BOTTOM_OF_PIPE with no access.
    pub fn compute_release(&self) -> BufferBarrier {
        let mut barrier = self.compute_to_graphics();
        if self.is_cross_family() {
            barrier.dst_access = AccessFlags::empty();
            barrier.dst_stage = PipelineStageFlags::BOTTOM_OF_PIPE;
        }
        barrier
    }
}

/// Record acquire barrier, dispatch, release barrier on a compute list
///
/// Both barrier halves are recorded on every call.
pub fn record_compute_dispatch(
    cmd: &mut dyn CommandList,
    transfer: &QueueOwnershipTransfer,
    pipeline: &Arc<dyn Pipeline>,
    binding_group: &Arc<dyn BindingGroup>,
    element_count: u32,
    workgroup_size: u32,
) -> Result<()> {
    let groups = dispatch_group_count(element_count, workgroup_size);
    engine_trace!("prism::compute", "dispatch {} groups for {} elements", groups, element_count);

    cmd.pipeline_barrier(&[transfer.compute_acquire()], &[])?;
    cmd.bind_pipeline(pipeline)?;
    cmd.bind_binding_group(pipeline, 0, binding_group)?;
    cmd.dispatch(groups, 1, 1)?;
    cmd.pipeline_barrier(&[transfer.compute_release()], &[])?;
    Ok(())
}

/// Graphics-side release before the compute submission
///
/// Only needed when ownership moves between families.
pub fn record_graphics_release(cmd: &mut dyn CommandList, transfer: &QueueOwnershipTransfer) -> Result<()> {
    if transfer.is_cross_family() {
        cmd.pipeline_barrier(&[transfer.graphics_to_compute()], &[])?;
    }
    Ok(())
}

/// Graphics-side acquire after the compute submission
///
/// Only needed when ownership moves between families.
pub fn record_graphics_acquire(cmd: &mut dyn CommandList, transfer: &QueueOwnershipTransfer) -> Result<()> {
    if transfer.is_cross_family() {
        cmd.pipeline_barrier(&[transfer.compute_to_graphics()], &[])?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "queue_transfer_tests.rs"]
mod tests;
