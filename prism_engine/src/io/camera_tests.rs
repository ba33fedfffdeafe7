use super::*;

#[test]
fn test_uniform_block_size_is_std140() {
    assert_eq!(std::mem::size_of::<CameraUniforms>(), 80);
}

#[test]
fn test_from_input_copies_matrix_and_time() {
    let input = FrameInput {
        view_projection: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        camera_position: Vec3::new(4.0, 5.0, 6.0),
        time: 1.5,
        delta_time: 0.016,
    };
    let uniforms = CameraUniforms::from_input(&input);

    assert_eq!(uniforms.view_projection[3], [1.0, 2.0, 3.0, 1.0]);
    assert_eq!(uniforms.position_time, [4.0, 5.0, 6.0, 1.5]);
    assert_eq!(uniforms.as_bytes().len(), 80);
}
