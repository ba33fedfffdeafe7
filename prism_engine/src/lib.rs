/*!
# Prism Engine

Thin rendering runtime over a backend-agnostic graphics device.

The crate owns the parts of a renderer that sit between an application and
the GPU API:

- **ResourceCaches**: reference-counted shader program, pipeline and texture
  caches keyed by content
- **TransientImagePool**: reusable render-target images keyed by
  (extent, format, usage)
- **FrameDriver**: ring of per-frame command lists and fences, surface
  rebuilds, the `draw()` loop
- **PostProcessGraph**: ordered full-screen passes (bloom, depth of field,
  passthrough) with their barriers
- **Effect**: what a frame renders (bloom, depth of field, particles, mesh
  viewer)

Backends (Vulkan in `prism_engine_renderer_vulkan`) implement the
`GraphicsDevice` family of traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod cache;
pub mod transient;
pub mod frame;
pub mod post_process;
pub mod compute;
pub mod effect;
pub mod io;

// Main prism namespace module
pub mod prism {
    pub use crate::error::{Error, Result};

    pub use crate::engine::Engine;

    // Logging types (the engine_* macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    /// Device traits and descriptors
    pub mod render {
        pub use crate::graphics_device::*;
    }

    pub mod cache {
        pub use crate::cache::*;
        pub use crate::transient::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod post {
        pub use crate::post_process::*;
        pub use crate::post_process::{bloom, depth_of_field, passthrough};
    }

    pub mod compute {
        pub use crate::compute::*;
    }

    pub mod effect {
        pub use crate::effect::*;
    }

    pub mod io {
        pub use crate::io::*;
    }
}

// Re-export math library at crate root
pub use glam;
