/// RenderTarget - attachment view over a color or depth texture

use crate::graphics_device::TextureFormat;

pub trait RenderTarget: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> TextureFormat;
}
