/// Device plus the caches and pool that outlive individual frames
///
/// Fields are public so callers can borrow the device and a cache at the
/// same time (`ctx.caches.acquire_pipeline(ctx.device.as_ref(), ..)`).
/// Not shared across threads.

use std::sync::Arc;
use crate::graphics_device::GraphicsDevice;
use crate::cache::ResourceCaches;
use crate::transient::TransientImagePool;

pub struct RenderContext {
    pub device: Arc<dyn GraphicsDevice>,
    pub caches: ResourceCaches,
    pub pool: TransientImagePool,
}

impl RenderContext {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            caches: ResourceCaches::new(),
            pool: TransientImagePool::new(),
        }
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }
}
