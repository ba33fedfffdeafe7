/// Per-frame camera input and its uniform block

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Values supplied by the application each frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Projection * view, computed by the caller's camera
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    /// Seconds since start
    pub time: f32,
    /// Seconds since the previous frame
    pub delta_time: f32,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            time: 0.0,
            delta_time: 0.0,
        }
    }
}

/// std140 uniform block shared by every scene shader (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// xyz = camera position, w = time
    pub position_time: [f32; 4],
}

impl CameraUniforms {
    pub fn from_input(input: &FrameInput) -> Self {
        Self {
            view_projection: input.view_projection.to_cols_array_2d(),
            position_time: input.camera_position.extend(input.time).to_array(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
