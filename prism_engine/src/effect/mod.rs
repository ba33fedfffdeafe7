/// Effects: what a frame renders
///
/// The frame driver only talks to `Effect`. Each variant owns its cached
/// pipelines, buffers and post-process graph.

pub mod effect;
pub mod shader_library;
pub mod uniform_ring;
pub mod scene_mesh;
pub mod bloom_effect;
pub mod depth_of_field_effect;
pub mod particle_effect;
pub mod mesh_viewer_effect;

#[cfg(test)]
pub(crate) mod test_support;

pub use effect::*;
pub use shader_library::*;
pub use uniform_ring::*;
pub use scene_mesh::*;
pub use bloom_effect::*;
pub use depth_of_field_effect::*;
pub use particle_effect::*;
pub use mesh_viewer_effect::*;
