/// Interfaces to external collaborators: mesh import, image decoding,
/// camera input and overlay UI

pub mod mesh;
pub mod image_loader;
pub mod camera;
pub mod overlay;

pub use mesh::*;
pub use image_loader::*;
pub use camera::*;
pub use overlay::*;
