/// Pool of reusable render-target images

pub mod transient_image_pool;

pub use transient_image_pool::*;
