use super::*;

fn binding(set: u32, binding: u32, binding_type: BindingType) -> ReflectedBinding {
    ReflectedBinding { set, binding, binding_type, count: 1 }
}

#[test]
fn test_merge_single_stage() {
    let fragment = [
        binding(0, 1, BindingType::CombinedImageSampler),
        binding(0, 0, BindingType::CombinedImageSampler),
    ];
    let layouts = merge_binding_layouts(&[(ShaderStage::Fragment, &fragment)]).unwrap();

    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts[0], BindingGroupLayoutDesc::samplers(2));
}

#[test]
fn test_merge_ors_stage_flags_for_shared_binding() {
    let vertex = [binding(0, 0, BindingType::UniformBuffer)];
    let fragment = [binding(0, 0, BindingType::UniformBuffer)];
    let layouts = merge_binding_layouts(&[
        (ShaderStage::Vertex, &vertex),
        (ShaderStage::Fragment, &fragment),
    ]).unwrap();

    assert_eq!(layouts[0].entries.len(), 1);
    assert_eq!(
        layouts[0].entries[0].stage_flags,
        ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT
    );
}

#[test]
fn test_merge_fills_missing_sets_with_empty_layouts() {
    let fragment = [binding(2, 0, BindingType::CombinedImageSampler)];
    let layouts = merge_binding_layouts(&[(ShaderStage::Fragment, &fragment)]).unwrap();

    assert_eq!(layouts.len(), 3);
    assert!(layouts[0].entries.is_empty());
    assert!(layouts[1].entries.is_empty());
    assert_eq!(layouts[2].entries.len(), 1);
}

#[test]
fn test_merge_rejects_conflicting_types() {
    let vertex = [binding(0, 0, BindingType::UniformBuffer)];
    let fragment = [binding(0, 0, BindingType::CombinedImageSampler)];
    let result = merge_binding_layouts(&[
        (ShaderStage::Vertex, &vertex),
        (ShaderStage::Fragment, &fragment),
    ]);

    assert!(result.is_err());
}

#[test]
fn test_merge_no_bindings() {
    let layouts = merge_binding_layouts(&[(ShaderStage::Vertex, &[])]).unwrap();
    assert!(layouts.is_empty());
}

#[test]
fn test_compute_storage_binding() {
    let compute = [
        binding(0, 0, BindingType::StorageBuffer),
        binding(0, 1, BindingType::UniformBuffer),
    ];
    let layouts = merge_binding_layouts(&[(ShaderStage::Compute, &compute)]).unwrap();

    let expected = BindingGroupLayoutDesc::default()
        .with(BindingType::StorageBuffer, ShaderStageFlags::COMPUTE)
        .with(BindingType::UniformBuffer, ShaderStageFlags::COMPUTE);
    assert_eq!(layouts[0], expected);
}
