/// Frame orchestration: per-frame resource ring, presentation surface,
/// frame targets and the draw loop

pub mod render_context;
pub mod frame_ring;
pub mod surface_chain;
pub mod frame_targets;
pub mod frame_driver;

pub use render_context::*;
pub use frame_ring::*;
pub use surface_chain::*;
pub use frame_targets::*;
pub use frame_driver::*;
