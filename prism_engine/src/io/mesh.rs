/// Mesh import interface
///
/// An importer (OBJ, glTF, ...) produces a `MeshDescription`; the runtime
/// derives the pipeline vertex layout and the upload payload from it.
///
/// Attribute locations are fixed: 0 position, 1 normal, 2 color, 3 texcoord.

use std::path::PathBuf;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferFormat, VertexAttribute, VertexBinding, VertexInputRate, VertexLayout,
};
use crate::engine_warn;

pub const LOCATION_POSITION: u32 = 0;
pub const LOCATION_NORMAL: u32 = 1;
pub const LOCATION_COLOR: u32 = 2;
pub const LOCATION_TEXCOORD: u32 = 3;

/// Interleaved vertex (position, normal, color, texcoord)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
}

/// Vertex storage
#[derive(Debug, Clone, PartialEq)]
pub enum VertexData {
    /// One stream per attribute; empty streams are absent
    Separate {
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        colors: Vec<Vec4>,
        texcoords: Vec<Vec2>,
    },
    /// One buffer with every attribute per vertex
    Interleaved(Vec<MeshVertex>),
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn from_points(points: &[Vec3]) -> Self {
        let min = points.iter().copied().fold(Vec3::splat(f32::MAX), Vec3::min);
        let max = points.iter().copied().fold(Vec3::splat(f32::MIN), Vec3::max);
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Length of the diagonal
    pub fn size(&self) -> f32 {
        (self.max - self.min).length()
    }
}

/// Surface material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub emission: Vec3,
    /// Resolved through the texture cache
    pub diffuse_texture: Option<PathBuf>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            emission: Vec3::ZERO,
            diffuse_texture: None,
        }
    }
}

/// Byte payload for the vertex buffer
#[derive(Debug, Clone, PartialEq)]
pub struct VertexUpload {
    pub bytes: Vec<u8>,
    /// Start of each vertex binding inside `bytes`, in binding order
    pub binding_offsets: Vec<u64>,
}

/// Imported mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescription {
    vertices: VertexData,
    indices: Vec<u32>,
    bounds: BoundingBox,
    materials: Vec<Material>,
}

impl MeshDescription {
    /// Build a mesh from per-attribute streams
    ///
    /// Streams whose length matches the position count are kept. When all of
    /// them match, vertices are interleaved; otherwise each kept stream gets
    /// its own binding. Mismatched streams are dropped with a warning.
    pub fn from_streams(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        colors: Vec<Vec4>,
        texcoords: Vec<Vec2>,
        indices: Vec<u32>,
        materials: Vec<Material>,
    ) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::InvalidResource("mesh has no positions".to_string()));
        }
        let count = positions.len();
        if let Some(bad) = indices.iter().find(|&&index| index as usize >= count) {
            return Err(Error::InvalidResource(format!(
                "mesh index {} out of range ({} vertices)", bad, count
            )));
        }

        let homogeneous = normals.len() == count && colors.len() == count && texcoords.len() == count;
        let bounds = BoundingBox::from_points(&positions);
        let materials = if materials.is_empty() { vec![Material::default()] } else { materials };

        let vertices = if homogeneous {
            VertexData::Interleaved(
                (0..count)
                    .map(|i| MeshVertex {
                        position: positions[i].to_array(),
                        normal: normals[i].to_array(),
                        color: colors[i].to_array(),
                        texcoord: texcoords[i].to_array(),
                    })
                    .collect(),
            )
        } else {
            VertexData::Separate {
                normals: keep_matching("normal", normals, count),
                colors: keep_matching("color", colors, count),
                texcoords: keep_matching("texcoord", texcoords, count),
                positions,
            }
        };

        Ok(Self { vertices, indices, bounds, materials })
    }

    pub fn vertices(&self) -> &VertexData {
        &self.vertices
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self.vertices, VertexData::Interleaved(_))
    }

    pub fn vertex_count(&self) -> u32 {
        match &self.vertices {
            VertexData::Separate { positions, .. } => positions.len() as u32,
            VertexData::Interleaved(vertices) => vertices.len() as u32,
        }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Pipeline vertex layout matching `vertex_bytes()`
    pub fn vertex_layout(&self) -> VertexLayout {
        match &self.vertices {
            VertexData::Interleaved(_) => {
                let attributes = [
                    (LOCATION_POSITION, BufferFormat::R32G32B32_SFLOAT),
                    (LOCATION_NORMAL, BufferFormat::R32G32B32_SFLOAT),
                    (LOCATION_COLOR, BufferFormat::R32G32B32A32_SFLOAT),
                    (LOCATION_TEXCOORD, BufferFormat::R32G32_SFLOAT),
                ];
                let mut offset = 0;
                VertexLayout {
                    bindings: vec![VertexBinding {
                        binding: 0,
                        stride: std::mem::size_of::<MeshVertex>() as u32,
                        input_rate: VertexInputRate::Vertex,
                    }],
                    attributes: attributes
                        .iter()
                        .map(|&(location, format)| {
                            let attribute = VertexAttribute { location, binding: 0, format, offset };
                            offset += format.size_bytes();
                            attribute
                        })
                        .collect(),
                }
            }
            VertexData::Separate { normals, colors, texcoords, .. } => {
                let streams = [
                    (LOCATION_POSITION, BufferFormat::R32G32B32_SFLOAT, true),
                    (LOCATION_NORMAL, BufferFormat::R32G32B32_SFLOAT, !normals.is_empty()),
                    (LOCATION_COLOR, BufferFormat::R32G32B32A32_SFLOAT, !colors.is_empty()),
                    (LOCATION_TEXCOORD, BufferFormat::R32G32_SFLOAT, !texcoords.is_empty()),
                ];
                let mut layout = VertexLayout::default();
                for (location, format, _) in streams.iter().filter(|(_, _, present)| *present) {
                    let binding = layout.bindings.len() as u32;
                    layout.bindings.push(VertexBinding {
                        binding,
                        stride: format.size_bytes(),
                        input_rate: VertexInputRate::Vertex,
                    });
                    layout.attributes.push(VertexAttribute {
                        location: *location,
                        binding,
                        format: *format,
                        offset: 0,
                    });
                }
                layout
            }
        }
    }

    /// Vertex buffer contents, one region per binding of `vertex_layout()`
    pub fn vertex_bytes(&self) -> VertexUpload {
        match &self.vertices {
            VertexData::Interleaved(vertices) => VertexUpload {
                bytes: bytemuck::cast_slice(vertices).to_vec(),
                binding_offsets: vec![0],
            },
            VertexData::Separate { positions, normals, colors, texcoords } => {
                let mut upload = VertexUpload { bytes: Vec::new(), binding_offsets: Vec::new() };
                let regions: [&[u8]; 4] = [
                    bytemuck::cast_slice(positions),
                    bytemuck::cast_slice(normals),
                    bytemuck::cast_slice(colors),
                    bytemuck::cast_slice(texcoords),
                ];
                for (index, region) in regions.iter().enumerate() {
                    if index > 0 && region.is_empty() {
                        continue;
                    }
                    upload.binding_offsets.push(upload.bytes.len() as u64);
                    upload.bytes.extend_from_slice(region);
                }
                upload
            }
        }
    }

    /// Index buffer contents (u32)
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

fn keep_matching<T>(name: &str, stream: Vec<T>, count: usize) -> Vec<T> {
    if stream.is_empty() || stream.len() == count {
        stream
    } else {
        engine_warn!(
            "prism::MeshDescription",
            "dropping {} stream: {} entries for {} positions", name, stream.len(), count
        );
        Vec::new()
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
