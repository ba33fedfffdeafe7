/// One uniform buffer and binding group per frame ring slot
///
/// A slot's buffer is only rewritten after the ring has waited the slot's
/// fence, so the GPU never reads a block while the CPU writes it. Slots are
/// created on first use.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{BindingGroup, Buffer, GraphicsDevice};
use crate::engine_bail;
use super::uniform_buffer;

struct UniformSlot {
    buffer: Arc<dyn Buffer>,
    group: Arc<dyn BindingGroup>,
}

#[derive(Default)]
pub struct UniformRing {
    slots: Vec<Option<UniformSlot>>,
    current: Option<usize>,
}

impl UniformRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bytes` to `slot` and make it current
    ///
    /// `bind` creates the slot's binding group around its new buffer.
    pub fn write(
        &mut self,
        device: &dyn GraphicsDevice,
        slot: usize,
        bytes: &[u8],
        bind: impl FnOnce(&Arc<dyn Buffer>) -> Result<Arc<dyn BindingGroup>>,
    ) -> Result<()> {
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        match &self.slots[slot] {
            Some(entry) => entry.buffer.update(0, bytes)?,
            None => {
                let buffer = uniform_buffer(device, bytes)?;
                let group = bind(&buffer)?;
                self.slots[slot] = Some(UniformSlot { buffer, group });
            }
        }
        self.current = Some(slot);
        Ok(())
    }

    /// Binding group of the slot written last
    pub fn group(&self) -> Result<&Arc<dyn BindingGroup>> {
        match self.current.and_then(|slot| self.slots[slot].as_ref()) {
            Some(entry) => Ok(&entry.group),
            None => engine_bail!("prism::UniformRing", "binding group used before the first write"),
        }
    }

    /// Buffer of the slot written last
    pub fn buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.current.and_then(|slot| self.slots[slot].as_ref()).map(|entry| &entry.buffer)
    }

    /// Number of slots created so far
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffer and group (device idle)
    pub fn clear(&mut self) {
        self.slots.clear();
        self.current = None;
    }
}

#[cfg(test)]
#[path = "uniform_ring_tests.rs"]
mod tests;
