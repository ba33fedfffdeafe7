/// Ring of per-frame command lists and fences
///
/// A slot is re-recorded only after its fence, signaled by the slot's last
/// submission, has been waited. CPU recording can therefore run at most
/// `size - 1` frames ahead of the GPU.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, CommandList, Fence, Semaphore, QueueType};
use crate::transient::{TransientImage, TransientImagePool};
use crate::engine_trace;

/// Resources owned by one ring slot
pub struct FrameResources {
    /// Scene + post-process recording
    pub graphics: Box<dyn CommandList>,
    /// Overlay + present blit recording
    pub overlay: Box<dyn CommandList>,
    /// Effect simulation on the compute queue
    pub compute: Box<dyn CommandList>,
    /// Signaled by the compute submission, waited by the graphics one
    pub compute_finished: Arc<dyn Semaphore>,
    /// Signaled by the graphics submission, waited by the next compute one
    pub graphics_finished: Arc<dyn Semaphore>,
    /// Signaled by the slot's final submission
    pub fence: Arc<dyn Fence>,
    /// Images still referenced by in-flight commands of this slot
    deferred: Vec<TransientImage>,
    /// A submission will signal `fence`
    fence_pending: bool,
}

impl FrameResources {
    /// Record that the slot's fence was handed to a submission
    pub fn mark_submitted(&mut self) {
        self.fence_pending = true;
    }

    pub fn fence_pending(&self) -> bool {
        self.fence_pending
    }
}

/// Fixed-size ring of `FrameResources`
pub struct FrameRing {
    slots: Vec<FrameResources>,
    index: usize,
}

impl FrameRing {
    /// Create `size` slots with signaled fences
    pub fn new(device: &dyn GraphicsDevice, size: usize) -> Result<Self> {
        debug_assert!(size > 0, "frame ring needs at least one slot");
        let size = size.max(1);
        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            slots.push(FrameResources {
                graphics: device.create_command_list(QueueType::Graphics)?,
                overlay: device.create_command_list(QueueType::Graphics)?,
                compute: device.create_command_list(QueueType::Compute)?,
                compute_finished: device.create_semaphore()?,
                graphics_finished: device.create_semaphore()?,
                fence: device.create_fence(true)?,
                deferred: Vec::new(),
                fence_pending: true,
            });
        }
        Ok(Self { slots, index: size - 1 })
    }

    /// Advance to the next slot and make it safe to re-record
    ///
    /// Waits and resets the slot fence, then hands the slot's deferred
    /// transient images back to `pool`. A slot whose previous frame was
    /// abandoned before submission has no pending signal and is not waited.
    pub fn begin_frame(&mut self, pool: &mut TransientImagePool) -> Result<&mut FrameResources> {
        self.index = (self.index + 1) % self.slots.len();
        let slot = &mut self.slots[self.index];

        if slot.fence_pending {
            slot.fence.wait()?;
            slot.fence.reset()?;
            slot.fence_pending = false;
        } else {
            engine_trace!("prism::FrameRing", "slot {} has no pending submission", self.index);
        }

        for image in slot.deferred.drain(..) {
            pool.release(image);
        }
        Ok(slot)
    }

    /// Keep `image` alive until the current slot's fence has been waited
    pub fn defer_release(&mut self, image: TransientImage) {
        self.slots[self.index].deferred.push(image);
    }

    pub fn current(&mut self) -> &mut FrameResources {
        &mut self.slots[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Return every deferred image to `pool` (device must be idle)
    pub fn drain_deferred(&mut self, pool: &mut TransientImagePool) {
        for slot in &mut self.slots {
            for image in slot.deferred.drain(..) {
                pool.release(image);
            }
        }
    }
}

#[cfg(test)]
#[path = "frame_ring_tests.rs"]
mod tests;
