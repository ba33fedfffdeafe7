use super::*;
use crate::error::Error;

fn triangle() -> Vec<Vec3> {
    vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, -2.0)]
}

#[test]
fn test_homogeneous_streams_are_interleaved() {
    let mesh = MeshDescription::from_streams(
        triangle(),
        vec![Vec3::Z; 3],
        vec![Vec4::ONE; 3],
        vec![Vec2::ZERO; 3],
        vec![0, 1, 2],
        Vec::new(),
    ).unwrap();

    assert!(mesh.is_interleaved());
    let layout = mesh.vertex_layout();
    assert_eq!(layout.bindings.len(), 1);
    assert_eq!(layout.bindings[0].stride, 48);
    let offsets: Vec<u32> = layout.attributes.iter().map(|a| a.offset).collect();
    assert_eq!(offsets, vec![0, 12, 24, 40]);

    let upload = mesh.vertex_bytes();
    assert_eq!(upload.bytes.len(), 3 * 48);
    assert_eq!(upload.binding_offsets, vec![0]);
}

#[test]
fn test_partial_streams_stay_separate() {
    let mesh = MeshDescription::from_streams(
        triangle(),
        vec![Vec3::Z; 3],
        Vec::new(),
        vec![Vec2::ZERO; 3],
        vec![0, 1, 2],
        Vec::new(),
    ).unwrap();

    assert!(!mesh.is_interleaved());
    let layout = mesh.vertex_layout();
    let locations: Vec<u32> = layout.attributes.iter().map(|a| a.location).collect();
    assert_eq!(locations, vec![LOCATION_POSITION, LOCATION_NORMAL, LOCATION_TEXCOORD]);
    assert_eq!(layout.bindings.len(), 3);

    let upload = mesh.vertex_bytes();
    assert_eq!(upload.binding_offsets, vec![0, 36, 72]);
    assert_eq!(upload.bytes.len(), 36 + 36 + 24);
}

#[test]
fn test_mismatched_stream_is_dropped() {
    let mesh = MeshDescription::from_streams(
        triangle(),
        vec![Vec3::Z; 2],
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
    ).unwrap();

    match mesh.vertices() {
        VertexData::Separate { normals, .. } => assert!(normals.is_empty()),
        VertexData::Interleaved(_) => panic!("expected separate streams"),
    }
    assert_eq!(mesh.vertex_layout().attributes.len(), 1);
}

#[test]
fn test_rejects_empty_and_out_of_range() {
    let empty = MeshDescription::from_streams(Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    assert!(matches!(empty, Err(Error::InvalidResource(_))));

    let bad_index = MeshDescription::from_streams(triangle(), Vec::new(), Vec::new(), Vec::new(), vec![0, 1, 3], Vec::new());
    assert!(matches!(bad_index, Err(Error::InvalidResource(_))));
}

#[test]
fn test_bounds_and_default_material() {
    let mesh = MeshDescription::from_streams(triangle(), Vec::new(), Vec::new(), Vec::new(), vec![0, 1, 2], Vec::new()).unwrap();

    assert_eq!(mesh.bounds().min, Vec3::new(0.0, 0.0, -2.0));
    assert_eq!(mesh.bounds().max, Vec3::new(1.0, 1.0, 0.0));
    assert_eq!(mesh.bounds().center(), Vec3::new(0.5, 0.5, -1.0));
    assert_eq!(mesh.materials().len(), 1);
    assert_eq!(mesh.index_bytes().len(), 12);
    assert_eq!(mesh.vertex_count(), 3);
}
